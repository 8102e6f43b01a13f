//! Job Records
//!
//! A job is created once by the admission path in `Queued` and afterwards
//! only moved forward by the worker:
//!
//! ```text
//! Queued ──▶ Processing ──▶ Completed
//!    │            │
//!    └────────────┴──────▶ Failed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::StoreError;

/// Kind of work requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Review,
    Debug,
    Architecture,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Review => "review",
            JobKind::Debug => "debug",
            JobKind::Architecture => "architecture",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Forward-only transition table
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Queued, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a review job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub file_path: String,
    pub file_content: String,
    pub language: String,
}

impl ReviewInput {
    pub const UNKNOWN_PATH: &'static str = "unknown";
    pub const AUTO_LANGUAGE: &'static str = "auto";

    /// Build an input, filling the optional fields with their defaults
    pub fn new(file_content: String, file_path: Option<String>, language: Option<String>) -> Self {
        Self {
            file_path: file_path
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| Self::UNKNOWN_PATH.to_string()),
            file_content,
            language: language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| Self::AUTO_LANGUAGE.to_string()),
        }
    }

    /// Stored job payload
    pub fn payload(&self) -> serde_json::Value {
        serde_json::json!({
            "filePath": self.file_path,
            "fileContent": self.file_content,
            "language": self.language,
        })
    }
}

/// Worker-driven status change
#[derive(Debug, Clone, PartialEq)]
pub enum JobTransition {
    /// Worker picked the job up
    Start,
    /// Worker finished successfully
    Complete {
        result: serde_json::Value,
        tokens_charged: u64,
    },
    /// Worker gave up
    Fail { error: String, tokens_charged: u64 },
}

impl JobTransition {
    fn target(&self) -> JobStatus {
        match self {
            JobTransition::Start => JobStatus::Processing,
            JobTransition::Complete { .. } => JobStatus::Completed,
            JobTransition::Fail { .. } => JobStatus::Failed,
        }
    }
}

/// Durable job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Externally visible identifier
    pub job_id: Uuid,

    /// Owning account identity, immutable
    pub owner_identity: String,

    pub kind: JobKind,
    pub status: JobStatus,

    /// Opaque input payload
    pub input: serde_json::Value,

    /// Tokens charged against the budget at admission
    pub estimated_tokens: u64,

    /// Present once completed
    pub result: Option<serde_json::Value>,

    /// Set when the job reaches a terminal status
    pub tokens_charged: Option<u64>,

    /// Present once failed
    pub error_detail: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a queued review job with a fresh identifier
    pub fn new_review(owner_identity: impl Into<String>, input: &ReviewInput, estimated_tokens: u64) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            owner_identity: owner_identity.into(),
            kind: JobKind::Review,
            status: JobStatus::Queued,
            input: input.payload(),
            estimated_tokens,
            result: None,
            tokens_charged: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Whether `identity` owns this job
    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner_identity == identity
    }

    /// Apply a worker transition, refusing anything but forward moves
    pub fn apply(&mut self, transition: JobTransition) -> Result<(), StoreError> {
        let next = transition.target();
        if !self.status.can_transition_to(next) {
            return Err(StoreError::InvalidTransition(format!(
                "job {} cannot move from {} to {}",
                self.job_id, self.status, next
            )));
        }

        let now = Utc::now();
        match transition {
            JobTransition::Start => {}
            JobTransition::Complete {
                result,
                tokens_charged,
            } => {
                self.result = Some(result);
                self.tokens_charged = Some(tokens_charged);
                self.completed_at = Some(now);
            }
            JobTransition::Fail {
                error,
                tokens_charged,
            } => {
                self.error_detail = Some(error);
                self.tokens_charged = Some(tokens_charged);
                self.completed_at = Some(now);
            }
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Client-facing view
    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.job_id,
            status: self.status,
            kind: self.kind,
            created_at: self.created_at,
            result: self.result.clone(),
            tokens_charged: self.tokens_charged,
            error_detail: self.error_detail.clone(),
        }
    }
}

/// Status poll response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub kind: JobKind,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_charged: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn review() -> Job {
        let input = ReviewInput::new("fn main() {}".into(), Some("src/main.rs".into()), None);
        Job::new_review("user-1", &input, 2_503)
    }

    #[test]
    fn test_new_review_job() {
        let job = review();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.kind, JobKind::Review);
        assert_eq!(job.input["filePath"], "src/main.rs");
        assert_eq!(job.input["language"], "auto");
        assert!(job.result.is_none());
        assert!(job.tokens_charged.is_none());
    }

    #[test]
    fn test_payload_carries_every_field() {
        let input = ReviewInput::new("let x = 1;".into(), None, Some("rust".into()));
        let payload = input.payload();
        assert_eq!(payload["fileContent"], "let x = 1;");
        assert_eq!(payload["filePath"], "unknown");
        assert_eq!(payload["language"], "rust");

        let round: ReviewInput = serde_json::from_value(payload).unwrap();
        assert_eq!(round, input);
    }

    #[test]
    fn test_input_defaults() {
        let input = ReviewInput::new("x".into(), None, Some("  ".into()));
        assert_eq!(input.file_path, "unknown");
        assert_eq!(input.language, "auto");
    }

    #[test]
    fn test_job_ids_unique() {
        assert_ne!(review().job_id, review().job_id);
    }

    #[test]
    fn test_forward_transitions() {
        let mut job = review();
        job.apply(JobTransition::Start).unwrap();
        assert_eq!(job.status, JobStatus::Processing);

        job.apply(JobTransition::Complete {
            result: json!({"issues": []}),
            tokens_charged: 2_100,
        })
        .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.tokens_charged, Some(2_100));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_backward_transition_rejected() {
        let mut job = review();
        job.apply(JobTransition::Start).unwrap();
        job.apply(JobTransition::Fail {
            error: "model timeout".into(),
            tokens_charged: 0,
        })
        .unwrap();

        let err = job.apply(JobTransition::Start).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition(_)));
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn test_cannot_complete_without_processing() {
        let mut job = review();
        let err = job
            .apply(JobTransition::Complete {
                result: json!({}),
                tokens_charged: 1,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition(_)));
        assert!(job.result.is_none());
    }

    #[test]
    fn test_view_omits_absent_fields() {
        let job = review();
        let json = serde_json::to_value(job.view()).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["kind"], "review");
        assert!(json.get("result").is_none());
        assert!(json.get("errorDetail").is_none());
        assert!(json.get("jobId").is_some());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
    }
}
