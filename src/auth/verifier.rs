//! Identity verification seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::StoreError;

/// Subject established by a verified credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// Stable subject identifier
    pub subject: String,

    /// Email claim, informational only
    #[serde(default)]
    pub email: String,
}

impl VerifiedIdentity {
    pub fn new(subject: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
        }
    }
}

/// Authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    Missing,

    #[error("Authorization header is not a bearer credential")]
    Malformed,

    /// Signature, issuer, expiry or lookup rejected the credential
    #[error("Invalid credential: {0}")]
    Invalid(String),

    /// The verifier or credential store could not be reached
    #[error("Verifier unavailable: {0}")]
    Unavailable(StoreError),
}

/// Validates a bearer credential and yields its subject.
///
/// Signature and issuer checks belong to the implementation.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Verifier backed by a fixed token table (development and tests)
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, VerifiedIdentity>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, VerifiedIdentity>) -> Self {
        Self { tokens }
    }

    /// Add a token for `subject`
    pub fn with_token(
        mut self,
        token: impl Into<String>,
        subject: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        self.tokens
            .insert(token.into(), VerifiedIdentity::new(subject, email));
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthError::Invalid("unknown token".to_string()))
    }
}
