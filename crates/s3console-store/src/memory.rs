//! In-memory object store
//!
//! Keeps buckets and objects in process memory with S3 listing semantics.
//! Every call is recorded so callers can assert which store operations a
//! request reached.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use s3console_common::config::MAX_PRESIGN_EXPIRY_SECS;
use s3console_common::{
    AccessControlPolicy, Bucket, CannedAcl, Credentials, Grant, Grantee, ObjectList,
    ObjectSummary, Owner,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    ListObjectsRequest, ObjectHead, ObjectSource, ObjectStore, ObjectStream, StoreFactory,
    encode_key,
};

const OWNER_ID: &str = "memory-owner";
const OWNER_NAME: &str = "memory";
const ALL_USERS: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// One store operation as seen by [`MemoryStore`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreCall {
    pub op: &'static str,
    pub bucket: String,
    pub key: Option<String>,
}

struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
    acl: CannedAcl,
}

struct StoredBucket {
    created: DateTime<Utc>,
    acl: CannedAcl,
    objects: BTreeMap<String, StoredObject>,
}

/// Process-local object store
#[derive(Default)]
pub struct MemoryStore {
    buckets: RwLock<BTreeMap<String, StoredBucket>>,
    calls: Mutex<Vec<StoreCall>>,
    fail_waits: AtomicBool,
}

fn policy(acl: CannedAcl) -> AccessControlPolicy {
    let owner = Owner {
        display_name: Some(OWNER_NAME.to_string()),
        id: Some(OWNER_ID.to_string()),
    };

    let mut grants = vec![Grant {
        grantee: Grantee {
            display_name: owner.display_name.clone(),
            id: owner.id.clone(),
            grantee_type: "CanonicalUser".to_string(),
            ..Grantee::default()
        },
        permission: "FULL_CONTROL".to_string(),
    }];

    let group = |uri: &str, permission: &str| Grant {
        grantee: Grantee {
            grantee_type: "Group".to_string(),
            uri: Some(uri.to_string()),
            ..Grantee::default()
        },
        permission: permission.to_string(),
    };

    match acl {
        CannedAcl::PublicRead => grants.push(group(ALL_USERS, "READ")),
        CannedAcl::PublicReadWrite => {
            grants.push(group(ALL_USERS, "READ"));
            grants.push(group(ALL_USERS, "WRITE"));
        }
        CannedAcl::AuthenticatedRead => grants.push(group(AUTHENTICATED_USERS, "READ")),
        _ => {}
    }

    AccessControlPolicy { owner, grants }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations performed so far, oldest first
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Make `wait_until_bucket_not_exists` fail from now on
    pub fn fail_waits(&self, fail: bool) {
        self.fail_waits.store(fail, Ordering::SeqCst);
    }

    /// Whether `bucket` exists
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.read().contains_key(bucket)
    }

    /// Contents of an object, if present
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .read()
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| o.data.clone())
    }

    fn record(&self, op: &'static str, bucket: &str, key: Option<&str>) {
        self.calls.lock().push(StoreCall {
            op,
            bucket: bucket.to_string(),
            key: key.map(ToString::to_string),
        });
    }

    fn insert(&self, bucket: &str, key: &str, data: Bytes) -> StoreResult<()> {
        let mut buckets = self.buckets.write();
        let stored = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        stored.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
                acl: CannedAcl::Private,
            },
        );
        Ok(())
    }

    fn with_object<T>(
        &self,
        bucket: &str,
        key: &str,
        f: impl FnOnce(&mut StoredObject) -> T,
    ) -> StoreResult<T> {
        let mut buckets = self.buckets.write();
        let stored = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        let object = stored
            .objects
            .get_mut(key)
            .ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(f(object))
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> StoreResult<Vec<Bucket>> {
        self.record("ListBuckets", "", None);
        Ok(self
            .buckets
            .read()
            .iter()
            .map(|(name, b)| Bucket {
                name: name.clone(),
                creation_time: Some(b.created),
            })
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.record("CreateBucket", bucket, None);
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket) {
            return Err(StoreError::BucketAlreadyExists(bucket.to_string()));
        }
        buckets.insert(
            bucket.to_string(),
            StoredBucket {
                created: Utc::now(),
                acl: CannedAcl::Private,
                objects: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.record("DeleteBucket", bucket, None);
        let mut buckets = self.buckets.write();
        match buckets.get(bucket) {
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
            Some(b) if !b.objects.is_empty() => {
                Err(StoreError::BucketNotEmpty(bucket.to_string()))
            }
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn wait_until_bucket_not_exists(
        &self,
        bucket: &str,
        _timeout: Duration,
    ) -> StoreResult<()> {
        self.record("WaitUntilBucketNotExists", bucket, None);
        if self.fail_waits.load(Ordering::SeqCst) || self.has_bucket(bucket) {
            return Err(StoreError::Upstream {
                op: "WaitUntilBucketNotExists",
                message: format!("bucket {bucket} still exists"),
            });
        }
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead> {
        self.record("HeadObject", bucket, Some(key));
        self.with_object(bucket, key, |o| ObjectHead {
            size: i64::try_from(o.data.len()).unwrap_or(i64::MAX),
            content_type: None,
            last_modified: Some(o.last_modified),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStream> {
        self.record("GetObject", bucket, Some(key));
        let data = self.with_object(bucket, key, |o| o.data.clone())?;
        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: ObjectSource,
    ) -> StoreResult<Option<String>> {
        self.record("PutObject", bucket, Some(key));
        let data = match source {
            ObjectSource::Empty => Bytes::new(),
            ObjectSource::File { path, .. } => Bytes::from(tokio::fs::read(&path).await?),
        };
        self.insert(bucket, key, data)?;
        Ok(None)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.record("DeleteObject", bucket, Some(key));
        let mut buckets = self.buckets.write();
        let stored = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        // Deleting an absent key succeeds, as on S3
        stored.objects.remove(key);
        Ok(())
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ObjectList> {
        self.record("ListObjectsV2", &request.bucket, None);
        let buckets = self.buckets.read();
        let stored = buckets
            .get(&request.bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(request.bucket.clone()))?;

        let prefix = request.prefix.as_deref().unwrap_or_default();
        let start_after = request.start_after.as_deref().unwrap_or_default();
        let delimiter = request.delimiter.as_deref().filter(|d| !d.is_empty());
        let max_keys = usize::try_from(request.max_keys).unwrap_or(0);

        let mut list = ObjectList {
            start_after: start_after.to_string(),
            ..ObjectList::default()
        };
        let mut count = 0usize;

        for (key, object) in &stored.objects {
            if key.as_str() <= start_after || !key.starts_with(prefix) {
                continue;
            }

            let directory = delimiter.and_then(|d| {
                key[prefix.len()..]
                    .find(d)
                    .map(|pos| key[..prefix.len() + pos + d.len()].to_string())
            });
            if let Some(dir) = &directory
                && list.directories.last() == Some(dir)
            {
                continue;
            }

            if count == max_keys {
                list.is_truncated = true;
                break;
            }
            count += 1;

            match directory {
                Some(dir) => list.directories.push(dir),
                None => list.objects.push(ObjectSummary {
                    name: key.clone(),
                    size: i64::try_from(object.data.len()).unwrap_or(i64::MAX),
                    owner_id: OWNER_ID.to_string(),
                    owner_name: OWNER_NAME.to_string(),
                    storage_class: "STANDARD".to_string(),
                    last_modified: Some(object.last_modified),
                }),
            }
        }

        list.key_count = i64::try_from(count).unwrap_or(i64::MAX);
        Ok(list)
    }

    async fn get_bucket_acl(&self, bucket: &str) -> StoreResult<AccessControlPolicy> {
        self.record("GetBucketAcl", bucket, None);
        self.buckets
            .read()
            .get(bucket)
            .map(|b| policy(b.acl))
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: CannedAcl) -> StoreResult<()> {
        self.record("PutBucketAcl", bucket, None);
        if !acl.applies_to_bucket() {
            return Err(StoreError::InvalidArgument(format!(
                "{acl} cannot be applied to a bucket"
            )));
        }
        let mut buckets = self.buckets.write();
        let stored = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        stored.acl = acl;
        Ok(())
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> StoreResult<AccessControlPolicy> {
        self.record("GetObjectAcl", bucket, Some(key));
        self.with_object(bucket, key, |o| policy(o.acl))
    }

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()> {
        self.record("PutObjectAcl", bucket, Some(key));
        self.with_object(bucket, key, |o| o.acl = acl)
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<String> {
        self.record("PresignGetObject", bucket, Some(key));
        if expires_in.as_secs() > MAX_PRESIGN_EXPIRY_SECS {
            return Err(StoreError::InvalidArgument(format!(
                "expiry of {}s exceeds {MAX_PRESIGN_EXPIRY_SECS}s",
                expires_in.as_secs()
            )));
        }
        Ok(format!(
            "memory://{bucket}/{}?expires={}",
            encode_key(key),
            expires_in.as_secs()
        ))
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{bucket}/{}", encode_key(key))
    }
}

/// Factory handing out one shared [`MemoryStore`]
#[derive(Default)]
pub struct MemoryStoreFactory {
    store: Arc<MemoryStore>,
    connections: Mutex<Vec<String>>,
}

impl MemoryStoreFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared store behind every connection
    #[must_use]
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Access keys of every connection made so far
    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().clone()
    }
}

impl StoreFactory for MemoryStoreFactory {
    fn name(&self) -> &str {
        "memory"
    }

    fn connect(&self, credentials: &Credentials) -> StoreResult<Arc<dyn ObjectStore>> {
        debug!("Connecting to memory store as {}", credentials.access_key);
        self.connections.lock().push(credentials.access_key.clone());
        Ok(self.store())
    }
}
