//! Gateway Error Types
//!
//! Every rejection the gateway can produce, plus the error type shared by the
//! store, verifier and queue seams. The HTTP status mapping lives in
//! `server::response`.

/// Errors raised by a backing store, verifier or queue.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing service could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within its deadline
    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: &'static str, millis: u64 },

    /// The record the operation targets does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The requested change is not permitted for the current record state
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
}

/// Errors surfaced to gateway callers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed or missing request body
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing, invalid or expired credential
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Request window exhausted
    #[error("Rate limit exceeded: retry after {retry_after_secs}s")]
    RateLimited {
        limit: u32,
        remaining: u32,
        retry_after_secs: u64,
    },

    /// Token budget insufficient for the estimated cost
    #[error("Token quota exceeded: {tokens_used}/{tokens_limit} used, {requested} requested")]
    QuotaExceeded {
        tokens_used: u64,
        tokens_limit: u64,
        requested: u64,
    },

    /// Requested record does not exist
    #[error("Not found")]
    NotFound,

    /// Record exists but belongs to another account
    #[error("Access denied")]
    Forbidden,

    /// A fail-closed dependency could not complete the operation
    #[error("Dependency unavailable during {operation}: {source}")]
    DependencyUnavailable {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl GatewayError {
    /// Wrap a store error as a fail-closed dependency failure.
    pub fn dependency(operation: &'static str, source: StoreError) -> Self {
        GatewayError::DependencyUnavailable { operation, source }
    }

    /// Metric label for this rejection
    pub fn outcome_label(&self) -> &'static str {
        match self {
            GatewayError::InvalidInput(_) => "invalid_input",
            GatewayError::Unauthenticated(_) => "unauthenticated",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::QuotaExceeded { .. } => "quota_exceeded",
            GatewayError::NotFound => "not_found",
            GatewayError::Forbidden => "forbidden",
            GatewayError::DependencyUnavailable { .. } => "dependency_unavailable",
        }
    }

    /// Whether the client may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. } | GatewayError::DependencyUnavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let limited = GatewayError::RateLimited {
            limit: 10,
            remaining: 0,
            retry_after_secs: 12,
        };
        assert!(limited.is_retryable());

        let down = GatewayError::dependency("reserve", StoreError::Unavailable("refused".into()));
        assert!(down.is_retryable());

        let quota = GatewayError::QuotaExceeded {
            tokens_used: 199_000,
            tokens_limit: 200_000,
            requested: 3_500,
        };
        assert!(!quota.is_retryable());
        assert!(!GatewayError::Forbidden.is_retryable());
        assert!(!GatewayError::InvalidInput("empty".into()).is_retryable());
    }

    #[test]
    fn test_dependency_message_carries_operation() {
        let err = GatewayError::dependency(
            "job_store.create",
            StoreError::Timeout {
                operation: "job_store.create",
                millis: 2000,
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("job_store.create"));
        assert!(msg.contains("2000ms"));
    }
}
