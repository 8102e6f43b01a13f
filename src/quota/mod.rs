//! Token Quota Accounting
//!
//! Plan tiers, per-account token budgets and the store that enforces them.
//!
//! # Budget invariant
//!
//! `tokens_consumed <= tokens_limit` holds after every successful
//! reservation. The check and the charge happen in one
//! [`AccountStore::try_reserve`] call; callers never read the account, decide,
//! and then write.

pub mod account;
pub mod cost;
pub mod plan;
pub mod store;

pub use account::{Account, AccountUsage, ACCESS_CREDENTIAL_PREFIX};
pub use cost::estimate_cost;
pub use plan::{PlanLimits, PlanTier};
pub use store::{AccountStore, InMemoryAccountStore, Reservation};
