//! Admission stages.
//!
//! ```text
//! Received ─▶ RateLimited (reject)
//!    │
//!    ▼
//! RateChecked ─▶ BudgetRejected (reject)
//!    │
//!    ▼
//! BudgetReserved ─▶ Persisted ─▶ Enqueued (success)
//! ```

use std::fmt;

/// Where a submission is in the admission sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionStage {
    Received,
    RateLimited,
    RateChecked,
    BudgetRejected,
    BudgetReserved,
    Persisted,
    Enqueued,
}

impl AdmissionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            AdmissionStage::Received => "received",
            AdmissionStage::RateLimited => "rate_limited",
            AdmissionStage::RateChecked => "rate_checked",
            AdmissionStage::BudgetRejected => "budget_rejected",
            AdmissionStage::BudgetReserved => "budget_reserved",
            AdmissionStage::Persisted => "persisted",
            AdmissionStage::Enqueued => "enqueued",
        }
    }

    /// Whether the sequence ends here
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AdmissionStage::RateLimited | AdmissionStage::BudgetRejected | AdmissionStage::Enqueued
        )
    }

    /// Whether a stage may follow this one
    pub fn can_advance_to(self, next: AdmissionStage) -> bool {
        use AdmissionStage::*;
        matches!(
            (self, next),
            (Received, RateLimited)
                | (Received, RateChecked)
                | (RateChecked, BudgetRejected)
                | (RateChecked, BudgetReserved)
                | (BudgetReserved, Persisted)
                | (Persisted, Enqueued)
        )
    }

    /// Whether the gateway has committed side effects by this stage
    pub fn has_side_effects(self) -> bool {
        matches!(
            self,
            AdmissionStage::BudgetReserved | AdmissionStage::Persisted | AdmissionStage::Enqueued
        )
    }
}

impl fmt::Display for AdmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_path() {
        let path = [
            AdmissionStage::Received,
            AdmissionStage::RateChecked,
            AdmissionStage::BudgetReserved,
            AdmissionStage::Persisted,
            AdmissionStage::Enqueued,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(AdmissionStage::Enqueued.is_terminal());
    }

    #[test]
    fn test_rejections_have_no_side_effects() {
        assert!(AdmissionStage::RateLimited.is_terminal());
        assert!(AdmissionStage::BudgetRejected.is_terminal());
        assert!(!AdmissionStage::RateLimited.has_side_effects());
        assert!(!AdmissionStage::BudgetRejected.has_side_effects());
    }

    #[test]
    fn test_no_skipping_ahead() {
        assert!(!AdmissionStage::Received.can_advance_to(AdmissionStage::BudgetReserved));
        assert!(!AdmissionStage::RateChecked.can_advance_to(AdmissionStage::Persisted));
        assert!(!AdmissionStage::BudgetReserved.can_advance_to(AdmissionStage::Enqueued));
    }
}
