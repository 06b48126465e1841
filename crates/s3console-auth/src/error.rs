//! Credential resolution error types

use thiserror::Error;

/// Errors raised while resolving a user's object-store credentials
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing user id")]
    MissingUserId,

    #[error("auth node unavailable: {0}")]
    Unavailable(String),

    #[error("auth node request timed out")]
    Timeout,

    #[error("auth node rejected lookup for user {user_id}: status {status}")]
    Rejected { user_id: String, status: u16 },

    #[error("invalid auth node response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}
