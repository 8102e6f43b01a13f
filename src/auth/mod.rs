//! Authentication
//!
//! Turns an `Authorization: Bearer …` header into a [`VerifiedIdentity`].
//! Credentials carrying the account access-credential prefix are resolved
//! against the account store; everything else goes to the configured
//! [`IdentityVerifier`].

pub mod verifier;

pub use verifier::{AuthError, IdentityVerifier, StaticTokenVerifier, VerifiedIdentity};

use std::sync::Arc;
use tracing::debug;

use crate::quota::{AccountStore, ACCESS_CREDENTIAL_PREFIX};
use crate::timeout::DependencyTimeout;

const BEARER_PREFIX: &str = "Bearer ";

/// Extract the credential from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::Missing)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::Malformed)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

/// Resolves bearer credentials to identities
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn IdentityVerifier>,
    accounts: Arc<dyn AccountStore>,
    verify_timeout: DependencyTimeout,
    lookup_timeout: DependencyTimeout,
}

impl Authenticator {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        accounts: Arc<dyn AccountStore>,
        verify_timeout: DependencyTimeout,
        lookup_timeout: DependencyTimeout,
    ) -> Self {
        Self {
            verifier,
            accounts,
            verify_timeout,
            lookup_timeout,
        }
    }

    /// Authenticate the raw `Authorization` header value
    pub async fn authenticate(&self, header: Option<&str>) -> Result<VerifiedIdentity, AuthError> {
        let token = bearer_token(header)?;

        if token.starts_with(ACCESS_CREDENTIAL_PREFIX) {
            return self.authenticate_credential(token).await;
        }

        let verifier = Arc::clone(&self.verifier);
        let token = token.to_string();
        let outcome = self
            .verify_timeout
            .run(async move {
                match verifier.verify(&token).await {
                    Ok(identity) => Ok(Ok(identity)),
                    Err(AuthError::Unavailable(cause)) => Err(cause),
                    Err(rejected) => Ok(Err(rejected)),
                }
            })
            .await
            .map_err(AuthError::Unavailable)?;

        let identity = outcome?;
        if identity.subject.is_empty() {
            return Err(AuthError::Invalid("missing subject".to_string()));
        }
        Ok(identity)
    }

    async fn authenticate_credential(&self, credential: &str) -> Result<VerifiedIdentity, AuthError> {
        let account = self
            .lookup_timeout
            .run(self.accounts.find_by_credential(credential))
            .await
            .map_err(AuthError::Unavailable)?;

        match account {
            Some(account) => {
                debug!(identity = %account.identity, "Authenticated with access credential");
                Ok(VerifiedIdentity::new(account.identity, account.email))
            }
            None => Err(AuthError::Invalid("unknown access credential".to_string())),
        }
    }
}
