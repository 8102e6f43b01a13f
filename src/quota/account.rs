//! Account Records
//!
//! The quota- and rate-limit-bearing entity for one authenticated subject.

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::plan::PlanTier;

/// Prefix carried by every issued access credential
pub const ACCESS_CREDENTIAL_PREFIX: &str = "sk_ci_";

const ACCESS_CREDENTIAL_RANDOM_LEN: usize = 32;

/// Per-subject quota state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable subject identifier (primary key)
    pub identity: String,

    /// Informational email claim
    pub email: String,

    /// Current plan tier
    pub plan: PlanTier,

    /// Tokens consumed in the current billing period
    pub tokens_consumed: u64,

    /// Token budget derived from `plan`
    pub tokens_limit: u64,

    /// Opaque credential issued once at creation
    pub access_credential: String,

    /// Start of the current billing period
    pub period_started_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Provision a new account on the given plan
    pub fn new(identity: impl Into<String>, email: impl Into<String>, plan: PlanTier) -> Self {
        let now = Utc::now();
        Self {
            identity: identity.into(),
            email: email.into(),
            plan,
            tokens_consumed: 0,
            tokens_limit: plan.token_limit(),
            access_credential: generate_access_credential(),
            period_started_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `tokens` more can be charged without exceeding the limit
    pub fn has_budget(&self, tokens: u64) -> bool {
        self.tokens_consumed
            .checked_add(tokens)
            .is_some_and(|total| total <= self.tokens_limit)
    }

    /// Charge `tokens` if the budget allows it.
    ///
    /// Returns false and leaves the account untouched otherwise. Stores call
    /// this inside their atomic update.
    pub fn charge(&mut self, tokens: u64) -> bool {
        if !self.has_budget(tokens) {
            return false;
        }
        self.tokens_consumed += tokens;
        self.updated_at = Utc::now();
        true
    }

    /// Hand back tokens charged for work that was never recorded
    pub fn release(&mut self, tokens: u64) {
        self.tokens_consumed = self.tokens_consumed.saturating_sub(tokens);
        self.updated_at = Utc::now();
    }

    /// Move to a new plan; consumption carries over
    pub fn change_plan(&mut self, plan: PlanTier) {
        self.plan = plan;
        self.tokens_limit = plan.token_limit();
        self.updated_at = Utc::now();
    }

    /// Start a new billing period
    pub fn reset_period(&mut self) {
        let now = Utc::now();
        self.tokens_consumed = 0;
        self.period_started_at = now;
        self.updated_at = now;
    }

    /// Tokens still available this period
    pub fn tokens_remaining(&self) -> u64 {
        self.tokens_limit.saturating_sub(self.tokens_consumed)
    }

    /// Requests admitted per rate-limit window on the current plan
    pub fn rate_limit(&self) -> u32 {
        self.plan.rate_limit()
    }

    /// Snapshot of the account's usage
    pub fn usage(&self) -> AccountUsage {
        AccountUsage {
            plan: self.plan,
            tokens_used: self.tokens_consumed,
            tokens_limit: self.tokens_limit,
            tokens_remaining: self.tokens_remaining(),
            usage_percent: self.usage_percent(),
            period_started_at: self.period_started_at,
        }
    }

    fn usage_percent(&self) -> f64 {
        let used = self.tokens_consumed as f64;
        let limit = self.tokens_limit as f64;
        if limit > 0.0 {
            (used / limit) * 100.0
        } else {
            0.0
        }
    }
}

/// Token usage for a single account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUsage {
    pub plan: PlanTier,
    pub tokens_used: u64,
    pub tokens_limit: u64,
    pub tokens_remaining: u64,
    pub usage_percent: f64,
    pub period_started_at: DateTime<Utc>,
}

fn generate_access_credential() -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ACCESS_CREDENTIAL_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!("{ACCESS_CREDENTIAL_PREFIX}{random}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_defaults() {
        let account = Account::new("user-1", "a@example.com", PlanTier::Lite);
        assert_eq!(account.tokens_consumed, 0);
        assert_eq!(account.tokens_limit, 200_000);
        assert!(account.access_credential.starts_with(ACCESS_CREDENTIAL_PREFIX));
        assert_eq!(
            account.access_credential.len(),
            ACCESS_CREDENTIAL_PREFIX.len() + ACCESS_CREDENTIAL_RANDOM_LEN
        );
    }

    #[test]
    fn test_credentials_are_unique() {
        let a = Account::new("user-1", "", PlanTier::Lite);
        let b = Account::new("user-1", "", PlanTier::Lite);
        assert_ne!(a.access_credential, b.access_credential);
    }

    #[test]
    fn test_has_budget_boundary() {
        let mut account = Account::new("user-1", "", PlanTier::Lite);
        account.tokens_consumed = 196_500;
        assert!(account.has_budget(3_500));
        assert!(!account.has_budget(3_501));
        assert!(!account.has_budget(u64::MAX));
    }

    #[test]
    fn test_charge_refuses_over_limit() {
        let mut account = Account::new("user-1", "", PlanTier::Lite);
        assert!(account.charge(3_500));
        assert_eq!(account.tokens_consumed, 3_500);

        account.tokens_consumed = 199_999;
        assert!(!account.charge(2));
        assert_eq!(account.tokens_consumed, 199_999);
    }

    #[test]
    fn test_release_saturates() {
        let mut account = Account::new("user-1", "", PlanTier::Lite);
        account.charge(3_500);

        account.release(3_500);
        assert_eq!(account.tokens_consumed, 0);

        account.release(10);
        assert_eq!(account.tokens_consumed, 0);
    }

    #[test]
    fn test_plan_change_keeps_consumption() {
        let mut account = Account::new("user-1", "", PlanTier::Pro);
        account.charge(450_000);

        account.change_plan(PlanTier::Lite);
        assert_eq!(account.tokens_limit, 200_000);
        assert_eq!(account.tokens_consumed, 450_000);
        assert_eq!(account.tokens_remaining(), 0);
        assert!(!account.has_budget(1));
    }

    #[test]
    fn test_reset_period() {
        let mut account = Account::new("user-1", "", PlanTier::Lite);
        account.charge(10_000);
        let before = account.period_started_at;

        account.reset_period();
        assert_eq!(account.tokens_consumed, 0);
        assert!(account.period_started_at >= before);
    }

    #[test]
    fn test_usage_snapshot() {
        let mut account = Account::new("user-1", "", PlanTier::Lite);
        account.charge(50_000);

        let usage = account.usage();
        assert_eq!(usage.tokens_used, 50_000);
        assert_eq!(usage.tokens_remaining, 150_000);
        assert!((usage.usage_percent - 25.0).abs() < f64::EPSILON);
    }
}
