//! Plan Tiers
//!
//! Each tier maps to a monthly token budget and a per-minute request ceiling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Service level attached to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// Entry tier, assigned to newly provisioned accounts
    #[default]
    Lite,
    /// Individual paid tier
    Pro,
    /// Team tier
    Business,
}

/// Numeric limits for a plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    /// Tokens per billing period
    pub tokens_per_period: u64,

    /// Admitted requests per rate-limit window
    pub requests_per_window: u32,
}

impl PlanTier {
    /// All tiers, cheapest first
    pub const ALL: [PlanTier; 3] = [PlanTier::Lite, PlanTier::Pro, PlanTier::Business];

    /// Limits for this tier
    pub const fn limits(self) -> PlanLimits {
        match self {
            PlanTier::Lite => PlanLimits {
                tokens_per_period: 200_000,
                requests_per_window: 10,
            },
            PlanTier::Pro => PlanLimits {
                tokens_per_period: 500_000,
                requests_per_window: 30,
            },
            PlanTier::Business => PlanLimits {
                tokens_per_period: 4_000_000,
                requests_per_window: 100,
            },
        }
    }

    /// Monthly token budget
    pub const fn token_limit(self) -> u64 {
        self.limits().tokens_per_period
    }

    /// Requests admitted per window
    pub const fn rate_limit(self) -> u32 {
        self.limits().requests_per_window
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Lite => "lite",
            PlanTier::Pro => "pro",
            PlanTier::Business => "business",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised plan name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown plan tier: {0}")]
pub struct UnknownPlan(pub String);

impl FromStr for PlanTier {
    type Err = UnknownPlan;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lite" => Ok(PlanTier::Lite),
            "pro" => Ok(PlanTier::Pro),
            "business" => Ok(PlanTier::Business),
            other => Err(UnknownPlan(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits() {
        assert_eq!(PlanTier::Lite.token_limit(), 200_000);
        assert_eq!(PlanTier::Pro.token_limit(), 500_000);
        assert_eq!(PlanTier::Business.token_limit(), 4_000_000);
        assert_eq!(PlanTier::Lite.rate_limit(), 10);
    }

    #[test]
    fn test_limits_increase_with_tier() {
        for pair in PlanTier::ALL.windows(2) {
            assert!(pair[0].token_limit() < pair[1].token_limit());
            assert!(pair[0].rate_limit() < pair[1].rate_limit());
        }
    }

    #[test]
    fn test_default_is_lite() {
        assert_eq!(PlanTier::default(), PlanTier::Lite);
    }

    #[test]
    fn test_parse_plan() {
        assert_eq!("Pro".parse::<PlanTier>(), Ok(PlanTier::Pro));
        assert_eq!(" business ".parse::<PlanTier>(), Ok(PlanTier::Business));
        assert!("enterprise".parse::<PlanTier>().is_err());
    }

    #[test]
    fn test_plan_serialization() {
        let json = serde_json::to_string(&PlanTier::Business).unwrap();
        assert_eq!(json, "\"business\"");
        let parsed: PlanTier = serde_json::from_str("\"lite\"").unwrap();
        assert_eq!(parsed, PlanTier::Lite);
    }
}
