//! Rate Limiting Module
//!
//! Per-account request ceilings enforced with a fixed-window counter.
//!
//! # Window semantics
//!
//! - The first request after a window expires opens a new one with a TTL of
//!   `window_secs` (60 by default).
//! - Requests are counted until the plan's per-window limit; the next one is
//!   rejected with the window's remaining TTL as the retry hint.
//! - Windows are wall-clock, not rolling: a burst straddling a rollover can
//!   admit up to twice the limit within roughly one window length.
//!
//! # Failure policy
//!
//! The limiter fails open. A counter store outage admits the request through
//! a dedicated, logged and metered path; see [`RateLimiter::fail_open`].

pub mod config;
pub mod limiter;
pub mod window;

pub use config::RateLimitConfig;
pub use limiter::{RateDecision, RateLimiter};
pub use window::{InMemoryWindowStore, WindowSnapshot, WindowState, WindowStore};
