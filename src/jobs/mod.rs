//! Jobs
//!
//! Job records, their store and the queue that hands them to the worker.

pub mod job;
pub mod queue;
pub mod store;

pub use job::{Job, JobKind, JobStatus, JobTransition, JobView, ReviewInput};
pub use queue::{Delivery, InMemoryWorkQueue, QueueMessage, WorkQueue};
pub use store::{InMemoryJobStore, JobStore};
