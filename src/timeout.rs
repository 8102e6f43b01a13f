//! Dependency Timeouts
//!
//! Every call to an external store, verifier or queue is bounded. What
//! happens on expiry is decided by the caller: the rate limiter admits, every
//! other step aborts the admission.

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::error::StoreError;

/// Deadline for one kind of dependency call
#[derive(Debug, Clone, Copy)]
pub struct DependencyTimeout {
    operation: &'static str,
    duration: Duration,
}

impl DependencyTimeout {
    /// Create a timeout for the named operation
    pub fn new(operation: &'static str, duration: Duration) -> Self {
        Self {
            operation,
            duration,
        }
    }

    /// Create a timeout from milliseconds
    pub fn from_millis(operation: &'static str, millis: u64) -> Self {
        Self::new(operation, Duration::from_millis(millis))
    }

    /// Operation name used in logs and errors
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the timeout duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run `future`, converting expiry into [`StoreError::Timeout`].
    pub async fn run<F, T>(&self, future: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match time::timeout(self.duration, future).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                operation: self.operation,
                millis: self.duration.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let timeout = DependencyTimeout::from_millis("account_store.reserve", 100);
        let result = timeout.run(async { Ok::<_, StoreError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_passes_through_errors() {
        let timeout = DependencyTimeout::from_millis("queue.publish", 100);
        let result: Result<(), _> = timeout
            .run(async { Err(StoreError::Unavailable("broker down".into())) })
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_reports_operation() {
        let timeout = DependencyTimeout::from_millis("job_store.create", 250);
        let result: Result<(), _> = timeout
            .run(async {
                time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(StoreError::Timeout { operation, millis }) => {
                assert_eq!(operation, "job_store.create");
                assert_eq!(millis, 250);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
