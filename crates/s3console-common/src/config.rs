//! Configuration types for s3console
//!
//! Configuration is layered: built-in defaults, an optional TOML file, then
//! `S3CONSOLE__`-prefixed environment variables (`__` separates sections,
//! e.g. `S3CONSOLE__AUTH__SERVICE_KEY`).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "S3CONSOLE";

/// Largest page size the store accepts for a listing
pub const MAX_LIST_KEYS: i32 = 1000;

/// Longest lifetime S3 accepts for a presigned URL (7 days)
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration for the console
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Credential resolution configuration
    pub auth: AuthConfig,
    /// Object store configuration
    pub store: StoreConfig,
    /// Handler behavior
    pub console: ConsoleSettings,
}

impl ConsoleConfig {
    /// Load configuration from an optional TOML file plus the environment.
    ///
    /// A file passed here must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth.mode {
            AuthMode::AuthNode => {
                if self.auth.endpoint.is_empty() {
                    return Err(ConfigError::Invalid(
                        "auth.endpoint is required in authnode mode".to_string(),
                    ));
                }
                if self.auth.service_id.is_empty() {
                    return Err(ConfigError::Invalid(
                        "auth.service_id is required in authnode mode".to_string(),
                    ));
                }
            }
            AuthMode::Static => {
                if self.auth.static_access_key.is_empty() || self.auth.static_secret_key.is_empty()
                {
                    return Err(ConfigError::Invalid(
                        "auth.static_access_key and auth.static_secret_key are required in static mode"
                            .to_string(),
                    ));
                }
            }
        }

        if self.store.backend == StoreBackend::S3 && self.store.region.is_empty() {
            return Err(ConfigError::Invalid("store.region must not be empty".to_string()));
        }

        if !(1..=MAX_LIST_KEYS).contains(&self.console.default_max_keys) {
            return Err(ConfigError::Invalid(format!(
                "console.default_max_keys must be between 1 and {MAX_LIST_KEYS}"
            )));
        }

        if self.console.max_presign_expiry_secs == 0
            || self.console.max_presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS
        {
            return Err(ConfigError::Invalid(format!(
                "console.max_presign_expiry_secs must be between 1 and {MAX_PRESIGN_EXPIRY_SECS}"
            )));
        }
        if self.console.presign_expiry_secs == 0
            || self.console.presign_expiry_secs > self.console.max_presign_expiry_secs
        {
            return Err(ConfigError::Invalid(
                "console.presign_expiry_secs must be between 1 and console.max_presign_expiry_secs"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address for the console API
    pub listen: SocketAddr,
    /// Maximum request body size, bounds multipart uploads
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8500)),
            max_upload_bytes: 100 * 1024 * 1024, // 100 MB
        }
    }
}

/// How per-request credentials are obtained
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Exchange the user identifier for scoped keys at the auth node
    #[default]
    AuthNode,
    /// Fixed key pair from configuration (development and tests only)
    Static,
}

/// Credential resolution configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Auth node base URL (e.g. `http://authnode:8080`)
    pub endpoint: String,
    /// Identity this console presents to the auth node
    pub service_id: String,
    pub service_key: String,
    /// Request timeout for the capability lookup
    pub timeout_ms: u64,
    pub static_access_key: String,
    pub static_secret_key: String,
}

impl AuthConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::AuthNode,
            endpoint: "http://127.0.0.1:8080".to_string(),
            service_id: "s3console".to_string(),
            service_key: String::new(),
            timeout_ms: 5000,
            static_access_key: String::new(),
            static_secret_key: String::new(),
        }
    }
}

/// Object store backend selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Remote S3-compatible store
    #[default]
    S3,
    /// Process-local store (development and tests)
    Memory,
}

/// Object store client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub region: String,
    /// Store endpoint; empty means the SDK's default AWS endpoint
    pub endpoint: String,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    pub force_path_style: bool,
    /// Scheme used when `endpoint` has none
    pub use_tls: bool,
}

impl StoreConfig {
    /// Endpoint URL with a scheme, or `None` when no endpoint is configured
    #[must_use]
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return None;
        }
        if endpoint.contains("://") {
            return Some(endpoint.to_string());
        }
        let scheme = if self.use_tls { "https" } else { "http" };
        Some(format!("{scheme}://{endpoint}"))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::S3,
            region: "us-east-1".to_string(),
            endpoint: String::new(),
            force_path_style: true,
            use_tls: false,
        }
    }
}

/// What to do when the post-delete existence wait fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitFailurePolicy {
    /// Log the failure and report the delete as successful
    #[default]
    #[serde(rename = "log")]
    LogAndContinue,
    /// Report the delete as failed
    #[serde(rename = "fail")]
    Fail,
}

/// Handler behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleSettings {
    /// Page size used when a listing request has no usable `maxKeys`
    pub default_max_keys: i32,
    /// Upper bound for the bucket-deletion confirmation wait
    pub delete_wait_secs: u64,
    pub delete_wait_failure: WaitFailurePolicy,
    /// Default lifetime of presigned object URLs
    pub presign_expiry_secs: u64,
    pub max_presign_expiry_secs: u64,
}

impl ConsoleSettings {
    #[must_use]
    pub const fn delete_wait(&self) -> Duration {
        Duration::from_secs(self.delete_wait_secs)
    }
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            default_max_keys: MAX_LIST_KEYS,
            delete_wait_secs: 30,
            delete_wait_failure: WaitFailurePolicy::LogAndContinue,
            presign_expiry_secs: 60 * 60,
            max_presign_expiry_secs: MAX_PRESIGN_EXPIRY_SECS,
        }
    }
}
