//! Job Store
//!
//! Durable job records keyed by job id, with a non-unique owner index for
//! listing. The gateway only inserts; transitions come from the worker.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::job::{Job, JobTransition};
use crate::error::StoreError;

/// Persistence seam for jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job; fails with `Conflict` if the id is taken
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Jobs owned by `owner`, newest first
    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Apply a worker transition and return the updated job
    async fn transition(&self, job_id: Uuid, transition: JobTransition) -> Result<Job, StoreError>;
}

#[derive(Debug, Default)]
struct Jobs {
    by_id: HashMap<Uuid, Job>,
    by_owner: HashMap<String, Vec<Uuid>>,
}

/// In-process job store
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<Jobs>>,
}

impl InMemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs
    pub async fn count(&self) -> usize {
        self.jobs.read().await.by_id.len()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.by_id.contains_key(&job.job_id) {
            return Err(StoreError::Conflict(format!("job {} already exists", job.job_id)));
        }

        jobs.by_owner
            .entry(job.owner_identity.clone())
            .or_default()
            .push(job.job_id);
        jobs.by_id.insert(job.job_id, job.clone());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.by_id.get(&job_id).cloned())
    }

    async fn list_by_owner(&self, owner: &str, limit: usize) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut owned: Vec<Job> = jobs
            .by_owner
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| jobs.by_id.get(id)).cloned().collect())
            .unwrap_or_default();

        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn transition(&self, job_id: Uuid, transition: JobTransition) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .by_id
            .get_mut(&job_id)
            .ok_or_else(|| StoreError::NotFound(format!("job {job_id}")))?;

        job.apply(transition)?;
        Ok(job.clone())
    }
}
