//! s3console object store access
//!
//! This crate hides the object store behind the [`ObjectStore`] trait.
//! A [`StoreFactory`] turns the credentials resolved for one request into a
//! client bound to the deployment's region and endpoint.
//!
//! Backends:
//! - [`S3Store`]: any S3-compatible store through `aws-sdk-s3`
//! - [`MemoryStore`]: process-local store for development and tests

pub mod error;
pub mod memory;
pub mod s3;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, MemoryStoreFactory, StoreCall};
pub use s3::{S3Store, S3StoreFactory};
pub use store::{
    ListObjectsRequest, ObjectHead, ObjectSource, ObjectStore, ObjectStream, StoreFactory,
};

use s3console_common::{StoreBackend, StoreConfig};
use std::sync::Arc;

/// Build the factory selected by `store.backend`
#[must_use]
pub fn factory_from_config(config: &StoreConfig) -> Arc<dyn StoreFactory> {
    match config.backend {
        StoreBackend::S3 => Arc::new(S3StoreFactory::new(config.clone())),
        StoreBackend::Memory => Arc::new(MemoryStoreFactory::new()),
    }
}
