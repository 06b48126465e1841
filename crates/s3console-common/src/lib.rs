//! s3console Common - Shared types and configuration
//!
//! This crate provides the data model projected from the object store,
//! the scoped credential type, and the layered console configuration
//! used across all s3console components.

pub mod config;
pub mod types;

pub use config::{
    AuthConfig, AuthMode, ConfigError, ConsoleConfig, ConsoleSettings, ServerConfig,
    StoreBackend, StoreConfig, WaitFailurePolicy,
};
pub use types::*;
