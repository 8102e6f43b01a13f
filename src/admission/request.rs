//! Request and response bodies for the admission operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GatewayError;
use crate::jobs::{JobStatus, ReviewInput};
use crate::quota::{Account, AccountUsage};
use crate::rate_limit::RateDecision;

/// Review submission body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReview {
    #[serde(default)]
    pub file_path: Option<String>,

    #[serde(default)]
    pub file_content: Option<String>,

    #[serde(default)]
    pub language: Option<String>,
}

impl SubmitReview {
    pub fn new(file_content: impl Into<String>) -> Self {
        Self {
            file_content: Some(file_content.into()),
            ..Self::default()
        }
    }

    /// Check the body shape and build the job input
    pub fn into_input(self) -> Result<ReviewInput, GatewayError> {
        match self.file_content {
            Some(content) if !content.is_empty() => {
                Ok(ReviewInput::new(content, self.file_path, self.language))
            }
            _ => Err(GatewayError::InvalidInput("fileContent is required".to_string())),
        }
    }
}

/// Successful admission
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub estimated_tokens: u64,
    pub rate: RateDecision,
}

impl Admission {
    pub fn body(&self) -> SubmitResponse {
        SubmitResponse {
            job_id: self.job_id,
            status: self.status,
            estimated_tokens: self.estimated_tokens,
        }
    }
}

/// `POST /jobs` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub estimated_tokens: u64,
}

/// Rate-limit telemetry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitView {
    pub limit: u32,
    pub remaining: u32,
    pub reset_in_seconds: u64,
}

impl From<RateDecision> for RateLimitView {
    fn from(decision: RateDecision) -> Self {
        Self {
            limit: decision.limit,
            remaining: decision.remaining,
            reset_in_seconds: decision.reset_in_secs,
        }
    }
}

/// `GET /account` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub identity: String,
    pub email: String,
    #[serde(flatten)]
    pub usage: AccountUsage,
    pub rate_limit: RateLimitView,
    pub created_at: DateTime<Utc>,
}

impl AccountView {
    pub fn new(account: &Account, rate: RateDecision) -> Self {
        Self {
            identity: account.identity.clone(),
            email: account.email.clone(),
            usage: account.usage(),
            rate_limit: rate.into(),
            created_at: account.created_at,
        }
    }
}

/// `PATCH /account` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccount {
    pub email: String,
}
