//! Rate Limiter
//!
//! Per-account fixed-window request limiter backed by a shared
//! [`WindowStore`]. When the store cannot answer, requests are admitted
//! through [`RateLimiter::fail_open`] so the product stays available; those
//! admissions are logged at `warn` and counted separately from normal admits.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::RateLimitConfig;
use super::window::{WindowState, WindowStore};
use crate::error::StoreError;
use crate::metrics;
use crate::timeout::DependencyTimeout;

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request is allowed
    pub admitted: bool,

    /// Requests allowed per window
    pub limit: u32,

    /// Requests left in the window after this decision
    pub remaining: u32,

    /// Seconds until the window resets
    pub reset_in_secs: u64,

    /// Admitted only because the counter store was unreachable
    pub fail_open: bool,
}

impl RateDecision {
    fn from_state(limit: u32, state: WindowState) -> Self {
        Self {
            admitted: state.admitted,
            limit,
            remaining: limit.saturating_sub(state.count),
            reset_in_secs: ceil_secs(state.reset_in),
            fail_open: false,
        }
    }

    /// Whether this was a normal (not fail-open) admit
    pub fn is_counted(&self) -> bool {
        self.admitted && !self.fail_open
    }
}

/// Per-account request limiter
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    config: RateLimitConfig,
    timeout: DependencyTimeout,
}

impl RateLimiter {
    /// Create a limiter over the given counter store
    pub fn new(store: Arc<dyn WindowStore>, config: RateLimitConfig, timeout: DependencyTimeout) -> Self {
        Self {
            store,
            config,
            timeout,
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request for `identity` against `limit` requests per window.
    pub async fn allow(&self, identity: &str, limit: u32) -> RateDecision {
        if !self.config.enabled {
            return self.unlimited(limit);
        }

        if limit == 0 {
            metrics::RATE_LIMIT_DECISIONS_TOTAL
                .with_label_values(&["reject"])
                .inc();
            return RateDecision {
                admitted: false,
                limit,
                remaining: 0,
                reset_in_secs: self.config.window_secs,
                fail_open: false,
            };
        }

        let key = self.config.key_for(identity);
        let result = self
            .timeout
            .run(
                self.store
                    .increment_within_limit(&key, limit, self.config.window()),
            )
            .await;

        match result {
            Ok(state) => {
                let decision = RateDecision::from_state(limit, state);
                let label = if decision.admitted { "admit" } else { "reject" };
                metrics::RATE_LIMIT_DECISIONS_TOTAL
                    .with_label_values(&[label])
                    .inc();
                debug!(
                    identity = %identity,
                    admitted = decision.admitted,
                    remaining = decision.remaining,
                    reset_in_secs = decision.reset_in_secs,
                    "Rate limit decision"
                );
                decision
            }
            Err(cause) => self.fail_open(identity, limit, cause),
        }
    }

    /// Admit a request whose window could not be read or updated.
    ///
    /// The request is not counted anywhere, so `remaining` reports the full
    /// limit.
    pub fn fail_open(&self, identity: &str, limit: u32, cause: StoreError) -> RateDecision {
        warn!(
            identity = %identity,
            operation = self.timeout.operation(),
            error = %cause,
            "Rate limit store unavailable, admitting request (fail-open)"
        );
        metrics::RATE_LIMIT_DECISIONS_TOTAL
            .with_label_values(&["fail_open"])
            .inc();
        metrics::DEPENDENCY_ERRORS_TOTAL
            .with_label_values(&[self.timeout.operation()])
            .inc();

        RateDecision {
            admitted: true,
            limit,
            remaining: limit,
            reset_in_secs: self.config.window_secs,
            fail_open: true,
        }
    }

    /// Current window telemetry without counting a request
    pub async fn status(&self, identity: &str, limit: u32) -> RateDecision {
        if !self.config.enabled {
            return self.unlimited(limit);
        }

        let key = self.config.key_for(identity);
        match self.timeout.run(self.store.peek(&key)).await {
            Ok(Some(snapshot)) => RateDecision {
                admitted: snapshot.count < limit,
                limit,
                remaining: limit.saturating_sub(snapshot.count),
                reset_in_secs: ceil_secs(snapshot.reset_in),
                fail_open: false,
            },
            Ok(None) => RateDecision {
                admitted: limit > 0,
                limit,
                remaining: limit,
                reset_in_secs: self.config.window_secs,
                fail_open: false,
            },
            Err(cause) => {
                debug!(identity = %identity, error = %cause, "Rate limit status unavailable");
                RateDecision {
                    admitted: true,
                    limit,
                    remaining: limit,
                    reset_in_secs: self.config.window_secs,
                    fail_open: true,
                }
            }
        }
    }

    fn unlimited(&self, limit: u32) -> RateDecision {
        RateDecision {
            admitted: true,
            limit,
            remaining: limit,
            reset_in_secs: self.config.window_secs,
            fail_open: false,
        }
    }
}

/// Whole seconds, rounded up, never below one
fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}
