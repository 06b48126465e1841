//! Object store abstraction
//!
//! One [`ObjectStore`] is built per request from the resolved credentials
//! and dropped when the request ends.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use s3console_common::{AccessControlPolicy, Bucket, CannedAcl, Credentials, ObjectList};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreResult;

/// Streamed object body
pub type ObjectStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Result of a HEAD request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectHead {
    pub size: i64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Payload of a put
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectSource {
    /// Zero-byte object (folder markers)
    Empty,
    /// Spooled upload on local disk
    File { path: PathBuf, size: u64 },
}

impl ObjectSource {
    #[must_use]
    pub const fn size(&self) -> u64 {
        match self {
            Self::Empty => 0,
            Self::File { size, .. } => *size,
        }
    }
}

/// One page request of a delimiter-based listing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListObjectsRequest {
    pub bucket: String,
    pub prefix: Option<String>,
    pub start_after: Option<String>,
    pub delimiter: Option<String>,
    pub max_keys: i32,
}

/// Bucket and object operations used by the console
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> StoreResult<Vec<Bucket>>;

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()>;

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()>;

    /// Poll until the store reports the bucket gone, for at most `timeout`
    async fn wait_until_bucket_not_exists(&self, bucket: &str, timeout: Duration)
    -> StoreResult<()>;

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead>;

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStream>;

    /// Upload an object; returns the ETag when the store reports one
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: ObjectSource,
    ) -> StoreResult<Option<String>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()>;

    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ObjectList>;

    async fn get_bucket_acl(&self, bucket: &str) -> StoreResult<AccessControlPolicy>;

    async fn put_bucket_acl(&self, bucket: &str, acl: CannedAcl) -> StoreResult<()>;

    async fn get_object_acl(&self, bucket: &str, key: &str) -> StoreResult<AccessControlPolicy>;

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()>;

    /// Time-limited GET URL that needs no further credentials
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration)
    -> StoreResult<String>;

    /// Unsigned URL of an object, usable when the object is publicly readable
    fn object_url(&self, bucket: &str, key: &str) -> String;
}

/// Builds a store client for one set of credentials
pub trait StoreFactory: Send + Sync {
    /// Backend name, used in logs
    fn name(&self) -> &str;

    fn connect(&self, credentials: &Credentials) -> StoreResult<Arc<dyn ObjectStore>>;
}

/// Percent-encode an object key for a URL path, keeping `/` separators
#[must_use]
pub fn encode_key(key: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(char::from(b));
            }
            _ => {
                out.push('%');
                out.push(char::from(HEX[usize::from(b >> 4)]));
                out.push(char::from(HEX[usize::from(b & 0xf)]));
            }
        }
    }
    out
}
