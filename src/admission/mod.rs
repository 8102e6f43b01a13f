//! Job admission
//!
//! The gate in front of the review workers. A submission is admitted only
//! after it passes identity verification, the per-account rate window and
//! an atomic token reservation; the admitted job is persisted and handed to
//! the work queue, and the client polls for the outcome.

pub mod controller;
pub mod request;
pub mod stage;

pub use controller::{Backends, JobAdmissionController, ListLimits};
pub use request::{
    AccountView, Admission, RateLimitView, SubmitResponse, SubmitReview, UpdateAccount,
};
pub use stage::AdmissionStage;
