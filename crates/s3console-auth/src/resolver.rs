//! Credential resolver trait
//!
//! Handlers depend on this abstraction only, so the same request path serves
//! the auth node in production and an injected key pair in development.

use async_trait::async_trait;
use s3console_common::Credentials;

use crate::error::AuthError;

/// Resolves a user identifier to scoped object-store credentials
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolver name, used in logs
    fn name(&self) -> &str;

    /// Resolve credentials for `user_id`.
    ///
    /// Implementations must reject an empty identifier with
    /// [`AuthError::MissingUserId`] without contacting any service.
    async fn resolve(&self, user_id: &str) -> Result<Credentials, AuthError>;
}

/// Resolver that hands every user the same configured key pair
pub struct StaticResolver {
    credentials: Credentials,
}

impl StaticResolver {
    /// Create a resolver for a fixed key pair
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialResolver for StaticResolver {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self, user_id: &str) -> Result<Credentials, AuthError> {
        if user_id.is_empty() {
            return Err(AuthError::MissingUserId);
        }
        tracing::debug!("Using static credentials for user {}", user_id);
        Ok(self.credentials.clone())
    }
}
