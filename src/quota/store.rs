//! Account Store
//!
//! Shared storage for account quota state. Every mutation is a single
//! conditional update at the store, so several gateway instances can charge
//! the same account without a check-then-write race.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::account::Account;
use super::plan::PlanTier;
use crate::error::StoreError;

/// Outcome of a conditional token reservation
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    /// Tokens were charged; carries the updated account
    Reserved(Account),
    /// Budget insufficient; carries the unchanged account
    Insufficient(Account),
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved(_))
    }

    pub fn account(&self) -> &Account {
        match self {
            Reservation::Reserved(account) | Reservation::Insufficient(account) => account,
        }
    }
}

/// Persistence seam for accounts.
///
/// Accounts are unique by identity and by access credential.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fetch the account, inserting a fresh Lite account if absent.
    ///
    /// Must be a single insert-if-absent operation.
    async fn get_or_create(&self, identity: &str, email: &str) -> Result<Account, StoreError>;

    async fn get(&self, identity: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_credential(&self, credential: &str) -> Result<Option<Account>, StoreError>;

    /// Increment consumption by `tokens` only if the result stays within the limit.
    async fn try_reserve(&self, identity: &str, tokens: u64) -> Result<Reservation, StoreError>;

    /// Return a reservation whose job was never recorded. Saturates at zero.
    async fn release(&self, identity: &str, tokens: u64) -> Result<Option<Account>, StoreError>;

    async fn change_plan(&self, identity: &str, plan: PlanTier) -> Result<Option<Account>, StoreError>;

    async fn update_email(&self, identity: &str, email: &str) -> Result<Option<Account>, StoreError>;

    /// Zero one account's consumption for a new billing period
    async fn reset_period(&self, identity: &str) -> Result<Option<Account>, StoreError>;

    /// Zero every account's consumption; returns how many were reset
    async fn reset_all_periods(&self) -> Result<usize, StoreError>;

    /// Hard-delete the account; returns whether it existed.
    ///
    /// The current period's consumption outlives the record: re-provisioning
    /// the same identity before the next period reset starts from it.
    async fn erase(&self, identity: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Default)]
struct Accounts {
    by_identity: HashMap<String, Account>,
    /// Secondary unique index: credential -> identity
    by_credential: HashMap<String, String>,
    /// Period usage of erased identities, kept until the next period reset
    retained: HashMap<String, RetainedPeriod>,
}

#[derive(Debug, Clone, Copy)]
struct RetainedPeriod {
    tokens_consumed: u64,
    period_started_at: chrono::DateTime<chrono::Utc>,
}

impl Accounts {
    fn insert(&mut self, account: Account) -> Result<(), StoreError> {
        if self.by_credential.contains_key(&account.access_credential) {
            return Err(StoreError::Conflict("access credential already issued".to_string()));
        }
        self.by_credential
            .insert(account.access_credential.clone(), account.identity.clone());
        self.by_identity.insert(account.identity.clone(), account);
        Ok(())
    }

    fn update<F>(&mut self, identity: &str, f: F) -> Option<Account>
    where
        F: FnOnce(&mut Account),
    {
        let account = self.by_identity.get_mut(identity)?;
        f(account);
        Some(account.clone())
    }
}

/// In-process account store
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<Accounts>>,
}

impl InMemoryAccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account as-is (seeding and tests)
    pub async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.by_identity.contains_key(&account.identity) {
            return Err(StoreError::Conflict(format!(
                "account {} already exists",
                account.identity
            )));
        }
        accounts.insert(account)
    }

    /// Number of stored accounts
    pub async fn count(&self) -> usize {
        self.accounts.read().await.by_identity.len()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_or_create(&self, identity: &str, email: &str) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().await;

        if let Some(existing) = accounts.by_identity.get(identity) {
            return Ok(existing.clone());
        }

        let mut account = Account::new(identity, email, PlanTier::default());
        if let Some(period) = accounts.retained.get(identity).copied() {
            account.tokens_consumed = period.tokens_consumed;
            account.period_started_at = period.period_started_at;
        }
        accounts.insert(account.clone())?;
        accounts.retained.remove(identity);
        tracing::info!(identity = %identity, plan = %account.plan, "Provisioned account");
        Ok(account)
    }

    async fn get(&self, identity: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.by_identity.get(identity).cloned())
    }

    async fn find_by_credential(&self, credential: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .by_credential
            .get(credential)
            .and_then(|identity| accounts.by_identity.get(identity))
            .cloned())
    }

    async fn try_reserve(&self, identity: &str, tokens: u64) -> Result<Reservation, StoreError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .by_identity
            .get_mut(identity)
            .ok_or_else(|| StoreError::NotFound(format!("account {identity}")))?;

        if account.charge(tokens) {
            Ok(Reservation::Reserved(account.clone()))
        } else {
            Ok(Reservation::Insufficient(account.clone()))
        }
    }

    async fn release(&self, identity: &str, tokens: u64) -> Result<Option<Account>, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.update(identity, |account| account.release(tokens)))
    }

    async fn change_plan(&self, identity: &str, plan: PlanTier) -> Result<Option<Account>, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.update(identity, |account| account.change_plan(plan)))
    }

    async fn update_email(&self, identity: &str, email: &str) -> Result<Option<Account>, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.update(identity, |account| {
            account.email = email.to_string();
            account.updated_at = chrono::Utc::now();
        }))
    }

    async fn reset_period(&self, identity: &str) -> Result<Option<Account>, StoreError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.update(identity, Account::reset_period))
    }

    async fn reset_all_periods(&self) -> Result<usize, StoreError> {
        let mut accounts = self.accounts.write().await;
        for account in accounts.by_identity.values_mut() {
            account.reset_period();
        }
        accounts.retained.clear();
        Ok(accounts.by_identity.len())
    }

    async fn erase(&self, identity: &str) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().await;
        match accounts.by_identity.remove(identity) {
            Some(account) => {
                accounts.by_credential.remove(&account.access_credential);
                accounts.retained.insert(
                    account.identity,
                    RetainedPeriod {
                        tokens_consumed: account.tokens_consumed,
                        period_started_at: account.period_started_at,
                    },
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
