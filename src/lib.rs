//! Review Gateway Library
//!
//! Admission control in front of asynchronous code-review workers: bearer
//! authentication, per-account rate windows, monthly token budgets with
//! atomic reservation, job persistence and queue hand-off.

pub mod admission;
pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod metrics_server;
pub mod quota;
pub mod rate_limit;
pub mod server;
pub mod timeout;

pub use admission::JobAdmissionController;
pub use error::{GatewayError, StoreError};
