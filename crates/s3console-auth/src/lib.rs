//! s3console credential resolution
//!
//! Every console request carries a user identifier; this crate exchanges it
//! for a scoped access/secret key pair before any object-store call is made.
//!
//! - [`AuthNodeResolver`]: asks the external auth node for the user's
//!   capabilities (one HTTP call, no retries, no caching)
//! - [`StaticResolver`]: a fixed key pair injected through configuration,
//!   meant for development and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use s3console_auth::{CredentialResolver, resolver_from_config};
//!
//! let resolver = resolver_from_config(&config.auth)?;
//! let credentials = resolver.resolve("user-1").await?;
//! ```

pub mod authnode;
pub mod error;
pub mod resolver;

pub use authnode::{AuthNodeConfig, AuthNodeResolver};
pub use error::AuthError;
pub use resolver::{CredentialResolver, StaticResolver};

use s3console_common::{AuthConfig, AuthMode, Credentials};
use std::sync::Arc;

/// Build the resolver selected by `auth.mode`
pub fn resolver_from_config(config: &AuthConfig) -> Result<Arc<dyn CredentialResolver>, AuthError> {
    match config.mode {
        AuthMode::AuthNode => {
            let resolver = AuthNodeResolver::new(AuthNodeConfig {
                endpoint: config.endpoint.clone(),
                service_id: config.service_id.clone(),
                service_key: config.service_key.clone(),
                timeout: config.timeout(),
            })?;
            Ok(Arc::new(resolver))
        }
        AuthMode::Static => Ok(Arc::new(StaticResolver::new(Credentials::new(
            &config.static_access_key,
            &config.static_secret_key,
        )))),
    }
}
