//! Job Admission Controller
//!
//! Runs every submission through the same sequence: body shape, identity,
//! account, rate window, cost estimate, atomic budget reservation, job
//! record, queue publish. A rejection at any point before the reservation
//! leaves no state behind. A failed job write hands the reservation back.
//! Once the job is recorded there is no rollback.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::request::{Admission, AccountView, SubmitReview, UpdateAccount};
use super::stage::AdmissionStage;
use crate::auth::{AuthError, Authenticator, IdentityVerifier, VerifiedIdentity};
use crate::config::{GatewayConfig, TimeoutConfig};
use crate::error::{GatewayError, StoreError};
use crate::jobs::{Job, JobStore, JobView, QueueMessage, WorkQueue};
use crate::metrics;
use crate::quota::{estimate_cost, Account, AccountStore, PlanTier, Reservation};
use crate::rate_limit::{RateLimiter, WindowStore};
use crate::timeout::DependencyTimeout;

/// The external collaborators the controller talks to
#[derive(Clone)]
pub struct Backends {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub accounts: Arc<dyn AccountStore>,
    pub windows: Arc<dyn WindowStore>,
    pub jobs: Arc<dyn JobStore>,
    pub queue: Arc<dyn WorkQueue>,
}

/// Page size bounds for job listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub default: usize,
    pub max: usize,
}

impl ListLimits {
    fn clamp(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}

/// Admission gate in front of the review workers
#[derive(Clone)]
pub struct JobAdmissionController {
    auth: Authenticator,
    accounts: Arc<dyn AccountStore>,
    limiter: RateLimiter,
    jobs: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    timeouts: TimeoutConfig,
    list_limits: ListLimits,
    admin_token: Option<String>,
}

impl JobAdmissionController {
    /// Wire the controller from configuration and backends
    pub fn from_config(config: &GatewayConfig, backends: Backends) -> Self {
        let timeouts = config.timeouts.clone();
        let auth = Authenticator::new(
            backends.verifier,
            Arc::clone(&backends.accounts),
            timeouts.identity(),
            timeouts.account_store("account_store.find_by_credential"),
        );
        let limiter = RateLimiter::new(
            backends.windows,
            config.rate_limit.clone(),
            timeouts.rate_limit(),
        );

        Self {
            auth,
            accounts: backends.accounts,
            limiter,
            jobs: backends.jobs,
            queue: backends.queue,
            timeouts,
            list_limits: ListLimits {
                default: config.server.default_list_limit,
                max: config.server.max_list_limit,
            },
            admin_token: config.auth.admin_token.clone(),
        }
    }

    /// Whether admin operations are configured
    pub fn admin_enabled(&self) -> bool {
        self.admin_token.is_some()
    }

    /// Admit a review submission.
    pub async fn submit(
        &self,
        auth_header: Option<&str>,
        body: SubmitReview,
    ) -> Result<Admission, GatewayError> {
        let timer = metrics::ADMISSION_DURATION_SECONDS.start_timer();
        let result = self.admit(auth_header, body).await;
        timer.observe_duration();

        let outcome = match &result {
            Ok(_) => "admitted",
            Err(err) => err.outcome_label(),
        };
        metrics::ADMISSIONS_TOTAL.with_label_values(&[outcome]).inc();
        result
    }

    async fn admit(
        &self,
        auth_header: Option<&str>,
        body: SubmitReview,
    ) -> Result<Admission, GatewayError> {
        let input = body.into_input()?;
        let identity = self.authenticate(auth_header).await?;
        let subject = identity.subject.as_str();
        debug!(identity = %subject, stage = %AdmissionStage::Received, "Submission received");

        let account = self.account_for(&identity).await?;

        let rate = self.limiter.allow(subject, account.rate_limit()).await;
        if !rate.admitted {
            info!(
                identity = %subject,
                stage = %AdmissionStage::RateLimited,
                limit = rate.limit,
                retry_after_secs = rate.reset_in_secs,
                "Submission rejected"
            );
            return Err(GatewayError::RateLimited {
                limit: rate.limit,
                remaining: rate.remaining,
                retry_after_secs: rate.reset_in_secs,
            });
        }
        debug!(identity = %subject, stage = %AdmissionStage::RateChecked, fail_open = rate.fail_open);

        let estimated_tokens = estimate_cost(&input.file_content);
        let reservation = self
            .call(
                self.timeouts.account_store("account_store.reserve"),
                subject,
                self.accounts.try_reserve(subject, estimated_tokens),
            )
            .await?;

        let account = match reservation {
            Reservation::Reserved(account) => account,
            Reservation::Insufficient(account) => {
                info!(
                    identity = %subject,
                    stage = %AdmissionStage::BudgetRejected,
                    tokens_used = account.tokens_consumed,
                    tokens_limit = account.tokens_limit,
                    requested = estimated_tokens,
                    "Submission rejected"
                );
                return Err(GatewayError::QuotaExceeded {
                    tokens_used: account.tokens_consumed,
                    tokens_limit: account.tokens_limit,
                    requested: estimated_tokens,
                });
            }
        };
        metrics::TOKENS_RESERVED_TOTAL.inc_by(estimated_tokens);
        debug!(
            identity = %subject,
            stage = %AdmissionStage::BudgetReserved,
            tokens_consumed = account.tokens_consumed,
        );

        let job = Job::new_review(subject, &input, estimated_tokens);
        if let Err(err) = self
            .call(
                self.timeouts.job_store("job_store.create"),
                subject,
                self.jobs.create(&job),
            )
            .await
        {
            self.release(subject, estimated_tokens).await;
            return Err(err);
        }
        debug!(identity = %subject, job_id = %job.job_id, stage = %AdmissionStage::Persisted);

        let message_id = self
            .call(
                self.timeouts.queue(),
                subject,
                self.queue.publish(&QueueMessage::for_job(&job)),
            )
            .await?;

        info!(
            identity = %subject,
            job_id = %job.job_id,
            message_id = %message_id,
            estimated_tokens,
            stage = %AdmissionStage::Enqueued,
            "Job admitted"
        );

        Ok(Admission {
            job_id: job.job_id,
            status: job.status,
            estimated_tokens,
            rate,
        })
    }

    /// Poll one job. Only the owner sees it.
    pub async fn get_status(
        &self,
        auth_header: Option<&str>,
        job_id: &str,
    ) -> Result<JobView, GatewayError> {
        let identity = self.authenticate(auth_header).await?;
        let job_id = Uuid::parse_str(job_id).map_err(|_| GatewayError::NotFound)?;

        let job = self
            .call(
                self.timeouts.job_store("job_store.get"),
                &identity.subject,
                self.jobs.get(job_id),
            )
            .await?
            .ok_or(GatewayError::NotFound)?;

        if !job.is_owned_by(&identity.subject) {
            warn!(identity = %identity.subject, job_id = %job_id, "Job requested by non-owner");
            return Err(GatewayError::Forbidden);
        }
        Ok(job.view())
    }

    /// The caller's jobs, newest first
    pub async fn list_jobs(
        &self,
        auth_header: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<JobView>, GatewayError> {
        let identity = self.authenticate(auth_header).await?;
        let limit = self.list_limits.clamp(limit);

        let jobs = self
            .call(
                self.timeouts.job_store("job_store.list_by_owner"),
                &identity.subject,
                self.jobs.list_by_owner(&identity.subject, limit),
            )
            .await?;
        Ok(jobs.iter().map(Job::view).collect())
    }

    /// Plan, budget and rate window of the caller. Does not count a request.
    pub async fn account_view(&self, auth_header: Option<&str>) -> Result<AccountView, GatewayError> {
        let identity = self.authenticate(auth_header).await?;
        let account = self.account_for(&identity).await?;
        let rate = self
            .limiter
            .status(&identity.subject, account.rate_limit())
            .await;
        Ok(AccountView::new(&account, rate))
    }

    /// Replace the caller's informational email
    pub async fn update_email(
        &self,
        auth_header: Option<&str>,
        update: UpdateAccount,
    ) -> Result<AccountView, GatewayError> {
        let email = update.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(GatewayError::InvalidInput("email must be an address".to_string()));
        }

        let identity = self.authenticate(auth_header).await?;
        self.account_for(&identity).await?;

        let account = self
            .call(
                self.timeouts.account_store("account_store.update_email"),
                &identity.subject,
                self.accounts.update_email(&identity.subject, email),
            )
            .await?
            .ok_or(GatewayError::NotFound)?;

        let rate = self
            .limiter
            .status(&identity.subject, account.rate_limit())
            .await;
        Ok(AccountView::new(&account, rate))
    }

    /// Erase the caller's account record.
    ///
    /// The rate window and the period's consumption survive, so erasing and
    /// resubmitting never restores budget.
    pub async fn erase_account(&self, auth_header: Option<&str>) -> Result<(), GatewayError> {
        let identity = self.authenticate(auth_header).await?;
        let subject = identity.subject.as_str();

        let erased = self
            .call(
                self.timeouts.account_store("account_store.erase"),
                subject,
                self.accounts.erase(subject),
            )
            .await?;
        if !erased {
            return Err(GatewayError::NotFound);
        }

        info!(identity = %subject, "Account erased");
        Ok(())
    }

    /// Move an account to another plan
    pub async fn change_plan(
        &self,
        auth_header: Option<&str>,
        identity: &str,
        plan: PlanTier,
    ) -> Result<Account, GatewayError> {
        self.authorize_admin(auth_header)?;

        let account = self
            .call(
                self.timeouts.account_store("account_store.change_plan"),
                identity,
                self.accounts.change_plan(identity, plan),
            )
            .await?
            .ok_or(GatewayError::NotFound)?;

        info!(identity = %identity, plan = %plan, "Plan changed");
        Ok(account)
    }

    /// Start a new billing period for every account
    pub async fn reset_all_periods(&self, auth_header: Option<&str>) -> Result<usize, GatewayError> {
        self.authorize_admin(auth_header)?;

        let count = self
            .call(
                self.timeouts.account_store("account_store.reset_all_periods"),
                "admin",
                self.accounts.reset_all_periods(),
            )
            .await?;

        info!(accounts = count, "Billing period reset");
        Ok(count)
    }

    fn authorize_admin(&self, auth_header: Option<&str>) -> Result<(), GatewayError> {
        let expected = self.admin_token.as_deref().ok_or(GatewayError::NotFound)?;
        let token = crate::auth::bearer_token(auth_header)
            .map_err(|err| GatewayError::Unauthenticated(err.to_string()))?;

        if token != expected {
            warn!("Admin operation attempted with wrong credential");
            return Err(GatewayError::Forbidden);
        }
        Ok(())
    }

    async fn authenticate(&self, auth_header: Option<&str>) -> Result<VerifiedIdentity, GatewayError> {
        self.auth
            .authenticate(auth_header)
            .await
            .map_err(|err| match err {
                AuthError::Unavailable(cause) => {
                    let operation = match &cause {
                        StoreError::Timeout { operation, .. } => *operation,
                        _ => "identity.verify",
                    };
                    error!(operation, error = %cause, "Identity verification unavailable");
                    metrics::DEPENDENCY_ERRORS_TOTAL
                        .with_label_values(&[operation])
                        .inc();
                    GatewayError::dependency(operation, cause)
                }
                rejected => {
                    debug!(error = %rejected, "Authentication rejected");
                    GatewayError::Unauthenticated(rejected.to_string())
                }
            })
    }

    async fn account_for(&self, identity: &VerifiedIdentity) -> Result<Account, GatewayError> {
        self.call(
            self.timeouts.account_store("account_store.get_or_create"),
            &identity.subject,
            self.accounts.get_or_create(&identity.subject, &identity.email),
        )
        .await
    }

    /// Hand back a reservation whose job was never persisted
    async fn release(&self, identity: &str, tokens: u64) {
        let timeout = self.timeouts.account_store("account_store.release");
        match timeout.run(self.accounts.release(identity, tokens)).await {
            Ok(_) => {
                info!(identity = %identity, tokens, "Released reservation for unrecorded job");
            }
            Err(cause) => {
                error!(
                    identity = %identity,
                    tokens,
                    error = %cause,
                    "Failed to release reservation, tokens stay charged"
                );
                metrics::DEPENDENCY_ERRORS_TOTAL
                    .with_label_values(&[timeout.operation()])
                    .inc();
            }
        }
    }

    /// Run a fail-closed dependency call under its deadline
    async fn call<T, F>(
        &self,
        timeout: DependencyTimeout,
        identity: &str,
        future: F,
    ) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        timeout.run(future).await.map_err(|cause| {
            error!(
                identity = %identity,
                operation = timeout.operation(),
                error = %cause,
                "Dependency call failed, rejecting request"
            );
            metrics::DEPENDENCY_ERRORS_TOTAL
                .with_label_values(&[timeout.operation()])
                .inc();
            GatewayError::dependency(timeout.operation(), cause)
        })
    }
}
