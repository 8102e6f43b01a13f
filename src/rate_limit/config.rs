//! Rate Limit Configuration
//!
//! Window settings for the per-account request limiter. The per-window
//! ceilings themselves come from the account's plan tier.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default window length in seconds
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Prefix for window keys in the counter store
pub const DEFAULT_KEY_PREFIX: &str = "ratelimit:";

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,

    /// Fixed window length in seconds
    pub window_secs: u64,

    /// Prefix prepended to the identity to form the counter key
    pub key_prefix: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: DEFAULT_WINDOW_SECS,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `REVIEW_GATEWAY_RATE_LIMIT_*` environment overrides
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("REVIEW_GATEWAY_RATE_LIMIT_ENABLED") {
            self.enabled = val.parse().unwrap_or(self.enabled);
        }

        if let Ok(val) = std::env::var("REVIEW_GATEWAY_RATE_LIMIT_WINDOW_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                if secs > 0 {
                    self.window_secs = secs;
                }
            }
        }

        self
    }

    /// Get window duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Counter key for an identity
    pub fn key_for(&self, identity: &str) -> String {
        format!("{}{}", self.key_prefix, identity)
    }

    /// Disable rate limiting (for testing)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}
