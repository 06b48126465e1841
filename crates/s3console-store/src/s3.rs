//! S3-compatible store backed by `aws-sdk-s3`

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::client::Waiters;
use aws_sdk_s3::config::{BehaviorVersion, Credentials as SdkCredentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime as SdkDateTime};
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl,
};
use chrono::{DateTime, Utc};
use s3console_common::{
    AccessControlPolicy, Bucket, CannedAcl, Credentials, Grant, Grantee, ObjectList,
    ObjectSummary, Owner, StoreConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    ListObjectsRequest, ObjectHead, ObjectSource, ObjectStore, ObjectStream, StoreFactory,
    encode_key,
};

/// Region for which S3 rejects an explicit location constraint
const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Provider name attached to the per-request SDK credentials
const CREDENTIALS_PROVIDER: &str = "s3console";

fn to_utc(dt: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

fn upstream<E: std::error::Error>(op: &'static str, err: &E) -> StoreError {
    StoreError::Upstream {
        op,
        message: DisplayErrorContext(err).to_string(),
    }
}

fn http_status<E>(err: &SdkError<E>) -> Option<u16> {
    err.raw_response().map(|r| r.status().as_u16())
}

fn project_acl(
    owner: Option<&aws_sdk_s3::types::Owner>,
    grants: &[aws_sdk_s3::types::Grant],
) -> AccessControlPolicy {
    let owner = owner
        .map(|o| Owner {
            display_name: o.display_name().map(ToString::to_string),
            id: o.id().map(ToString::to_string),
        })
        .unwrap_or_default();

    let grants = grants
        .iter()
        .map(|g| {
            let grantee = g
                .grantee()
                .map(|ge| {
                    let uri = ge.uri().map(ToString::to_string);
                    let email_address = ge.email_address().map(ToString::to_string);
                    let grantee_type = if uri.is_some() {
                        "Group"
                    } else if email_address.is_some() {
                        "AmazonCustomerByEmail"
                    } else {
                        "CanonicalUser"
                    };
                    Grantee {
                        display_name: ge.display_name().map(ToString::to_string),
                        email_address,
                        id: ge.id().map(ToString::to_string),
                        grantee_type: grantee_type.to_string(),
                        uri,
                    }
                })
                .unwrap_or_default();
            Grant {
                grantee,
                permission: g
                    .permission()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default(),
            }
        })
        .collect();

    AccessControlPolicy { owner, grants }
}

/// Client for one S3-compatible store and one key pair
pub struct S3Store {
    client: Client,
    endpoint: Option<String>,
    region: String,
    force_path_style: bool,
}

impl S3Store {
    /// Build a client bound to the configured region and endpoint
    #[must_use]
    pub fn new(config: &StoreConfig, credentials: &Credentials) -> Self {
        let sdk_credentials = SdkCredentials::new(
            credentials.access_key.clone(),
            credentials.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let endpoint = config.endpoint_url();
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(sdk_credentials)
            .force_path_style(config.force_path_style);
        if let Some(url) = &endpoint {
            builder = builder.endpoint_url(url);
        }

        Self {
            client: Client::from_conf(builder.build()),
            endpoint,
            region: config.region.clone(),
            force_path_style: config.force_path_style,
        }
    }

    /// Location constraint for bucket creation, only sent to AWS itself
    fn location_constraint(&self) -> Option<CreateBucketConfiguration> {
        if self.endpoint.is_some() || self.region == DEFAULT_AWS_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build(),
        )
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> StoreResult<Vec<Bucket>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| upstream("ListBuckets", &e))?;

        Ok(output
            .buckets()
            .iter()
            .map(|b| Bucket {
                name: b.name().unwrap_or_default().to_string(),
                creation_time: b.creation_date().and_then(to_utc),
            })
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(self.location_constraint())
            .send()
            .await
            .map_err(|e| upstream("CreateBucket", &e))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| upstream("DeleteBucket", &e))?;
        Ok(())
    }

    async fn wait_until_bucket_not_exists(
        &self,
        bucket: &str,
        timeout: Duration,
    ) -> StoreResult<()> {
        self.client
            .wait_until_bucket_not_exists()
            .bucket(bucket)
            .wait(timeout)
            .await
            .map_err(|e| upstream("WaitUntilBucketNotExists", &e))?;
        Ok(())
    }

    async fn head_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectHead> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if http_status(&e) == Some(404) {
                    StoreError::NoSuchKey {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    upstream("HeadObject", &e)
                }
            })?;

        Ok(ObjectHead {
            size: output.content_length().unwrap_or_default(),
            content_type: output.content_type().map(ToString::to_string),
            last_modified: output.last_modified().and_then(to_utc),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStream> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if http_status(&e) == Some(404) {
                    StoreError::NoSuchKey {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    upstream("GetObject", &e)
                }
            })?;

        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        source: ObjectSource,
    ) -> StoreResult<Option<String>> {
        let length = i64::try_from(source.size())
            .map_err(|_| StoreError::InvalidArgument(format!("object too large: {key}")))?;
        let body = match &source {
            ObjectSource::Empty => ByteStream::from_static(b""),
            ObjectSource::File { path, .. } => ByteStream::from_path(path)
                .await
                .map_err(|e| upstream("PutObject", &e))?,
        };

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(length)
            .body(body)
            .send()
            .await
            .map_err(|e| upstream("PutObject", &e))?;

        Ok(output.e_tag().map(ToString::to_string))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| upstream("DeleteObject", &e))?;
        Ok(())
    }

    async fn list_objects(&self, request: &ListObjectsRequest) -> StoreResult<ObjectList> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix(request.prefix.clone())
            .set_start_after(request.start_after.clone())
            .set_delimiter(request.delimiter.clone())
            .max_keys(request.max_keys)
            .fetch_owner(true)
            .send()
            .await
            .map_err(|e| upstream("ListObjectsV2", &e))?;

        let objects = output
            .contents()
            .iter()
            .map(|o| ObjectSummary {
                name: o.key().unwrap_or_default().to_string(),
                size: o.size().unwrap_or_default(),
                owner_id: o
                    .owner()
                    .and_then(|w| w.id())
                    .unwrap_or_default()
                    .to_string(),
                owner_name: o
                    .owner()
                    .and_then(|w| w.display_name())
                    .unwrap_or_default()
                    .to_string(),
                storage_class: o
                    .storage_class()
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_default(),
                last_modified: o.last_modified().and_then(to_utc),
            })
            .collect();

        let directories = output
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(ToString::to_string))
            .collect();

        Ok(ObjectList {
            key_count: i64::from(output.key_count().unwrap_or_default()),
            start_after: output.start_after().unwrap_or_default().to_string(),
            is_truncated: output.is_truncated().unwrap_or_default(),
            objects,
            directories,
            next_start_after: None,
        })
    }

    async fn get_bucket_acl(&self, bucket: &str) -> StoreResult<AccessControlPolicy> {
        let output = self
            .client
            .get_bucket_acl()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| upstream("GetBucketAcl", &e))?;
        Ok(project_acl(output.owner(), output.grants()))
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: CannedAcl) -> StoreResult<()> {
        self.client
            .put_bucket_acl()
            .bucket(bucket)
            .acl(BucketCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(|e| upstream("PutBucketAcl", &e))?;
        Ok(())
    }

    async fn get_object_acl(&self, bucket: &str, key: &str) -> StoreResult<AccessControlPolicy> {
        let output = self
            .client
            .get_object_acl()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| upstream("GetObjectAcl", &e))?;
        Ok(project_acl(output.owner(), output.grants()))
    }

    async fn put_object_acl(&self, bucket: &str, key: &str, acl: CannedAcl) -> StoreResult<()> {
        self.client
            .put_object_acl()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::from(acl.as_str()))
            .send()
            .await
            .map_err(|e| upstream("PutObjectAcl", &e))?;
        Ok(())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StoreResult<String> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StoreError::InvalidArgument(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| upstream("PresignGetObject", &e))?;
        Ok(request.uri().to_string())
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        let key = encode_key(key);
        match &self.endpoint {
            Some(endpoint) if self.force_path_style => format!("{endpoint}/{bucket}/{key}"),
            Some(endpoint) => match endpoint.split_once("://") {
                Some((scheme, host)) => format!("{scheme}://{bucket}.{host}/{key}"),
                None => format!("{endpoint}/{bucket}/{key}"),
            },
            None => format!("https://{bucket}.s3.{}.amazonaws.com/{key}", self.region),
        }
    }
}

/// Factory building an [`S3Store`] per request
pub struct S3StoreFactory {
    config: StoreConfig,
}

impl S3StoreFactory {
    #[must_use]
    pub const fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

impl StoreFactory for S3StoreFactory {
    fn name(&self) -> &str {
        "s3"
    }

    fn connect(&self, credentials: &Credentials) -> StoreResult<Arc<dyn ObjectStore>> {
        debug!(
            "Connecting to S3 store at {} as {}",
            self.config.endpoint_url().as_deref().unwrap_or("aws"),
            credentials.access_key
        );
        Ok(Arc::new(S3Store::new(&self.config, credentials)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{Method, StatusCode, Uri, header};
    use axum::response::IntoResponse;

    fn store_config(endpoint: &str, force_path_style: bool) -> StoreConfig {
        StoreConfig {
            endpoint: endpoint.to_string(),
            force_path_style,
            ..StoreConfig::default()
        }
    }

    fn creds() -> Credentials {
        Credentials::new("test-access", "test-secret")
    }

    #[tokio::test]
    async fn test_path_style_object_url() {
        let store = S3Store::new(&store_config("127.0.0.1:9000", true), &creds());
        assert_eq!(
            store.object_url("docs", "dir/a b.txt"),
            "http://127.0.0.1:9000/docs/dir/a%20b.txt"
        );
    }

    #[tokio::test]
    async fn test_virtual_host_object_url() {
        let store = S3Store::new(&store_config("https://s3.example.com", false), &creds());
        assert_eq!(
            store.object_url("docs", "a.txt"),
            "https://docs.s3.example.com/a.txt"
        );
    }

    #[tokio::test]
    async fn test_aws_object_url_and_location_constraint() {
        let mut config = store_config("", false);
        config.region = "eu-west-1".to_string();
        let store = S3Store::new(&config, &creds());
        assert_eq!(
            store.object_url("docs", "a.txt"),
            "https://docs.s3.eu-west-1.amazonaws.com/a.txt"
        );
        assert!(store.location_constraint().is_some());

        let custom = S3Store::new(&store_config("127.0.0.1:9000", true), &creds());
        assert!(custom.location_constraint().is_none());
    }

    #[tokio::test]
    async fn test_presign_against_custom_endpoint() {
        let store = S3Store::new(&store_config("127.0.0.1:9000", true), &creds());
        let url = store
            .presign_get("docs", "a.txt", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(url.starts_with("http://127.0.0.1:9000/docs/a.txt?"));
        assert!(url.contains("X-Amz-Expires=300"));
        assert!(url.contains("test-access"));
    }

    #[tokio::test]
    async fn test_presign_rejects_excessive_expiry() {
        let store = S3Store::new(&store_config("127.0.0.1:9000", true), &creds());
        let result = store
            .presign_get("docs", "a.txt", Duration::from_secs(8 * 24 * 60 * 60))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    }

    const ACL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AccessControlPolicy xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner><ID>owner-1</ID><DisplayName>Owner One</DisplayName></Owner>
  <AccessControlList>
    <Grant>
      <Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="CanonicalUser">
        <ID>owner-1</ID><DisplayName>Owner One</DisplayName>
      </Grantee>
      <Permission>FULL_CONTROL</Permission>
    </Grant>
    <Grant>
      <Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Group">
        <URI>http://acs.amazonaws.com/groups/global/AllUsers</URI>
      </Grantee>
      <Permission>READ</Permission>
    </Grant>
  </AccessControlList>
</AccessControlPolicy>"#;

    const LIST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>docs</Name>
  <Prefix></Prefix>
  <StartAfter>a.txt</StartAfter>
  <KeyCount>2</KeyCount>
  <MaxKeys>2</MaxKeys>
  <Delimiter>/</Delimiter>
  <IsTruncated>true</IsTruncated>
  <Contents>
    <Key>b.txt</Key>
    <LastModified>2024-01-02T03:04:05.000Z</LastModified>
    <ETag>&quot;0cc175b9c0f1b6a831c399e269772661&quot;</ETag>
    <Size>42</Size>
    <Owner><ID>owner-1</ID><DisplayName>Owner One</DisplayName></Owner>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <CommonPrefixes><Prefix>img/</Prefix></CommonPrefixes>
</ListBucketResult>"#;

    const NO_SUCH_KEY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message><Key>a.txt</Key></Error>"#;

    /// Minimal S3 endpoint: bucket `docs` holds no `a.txt`
    async fn fake_s3(method: Method, uri: Uri) -> impl IntoResponse {
        let query = uri.query().unwrap_or_default();
        let xml = [(header::CONTENT_TYPE, "application/xml")];
        match (method.as_str(), uri.path()) {
            ("HEAD", "/docs/a.txt") => (StatusCode::NOT_FOUND, xml, String::new()),
            ("GET", "/docs/a.txt") => (StatusCode::NOT_FOUND, xml, NO_SUCH_KEY_XML.to_string()),
            ("GET", "/docs" | "/docs/") if query.split('&').any(|p| p == "acl" || p == "acl=") => {
                (StatusCode::OK, xml, ACL_XML.to_string())
            }
            ("GET", "/docs" | "/docs/")
                if query.contains("list-type=2") && query.contains("fetch-owner=true") =>
            {
                (StatusCode::OK, xml, LIST_XML.to_string())
            }
            _ => (StatusCode::BAD_REQUEST, xml, String::new()),
        }
    }

    async fn fake_store() -> S3Store {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, Router::new().fallback(fake_s3))
                .await
                .unwrap();
        });
        S3Store::new(&store_config(&format!("http://{addr}"), true), &creds())
    }

    #[tokio::test]
    async fn test_missing_key_maps_to_no_such_key() {
        let store = fake_store().await;

        let err = store.head_object("docs", "a.txt").await.unwrap_err();
        assert!(matches!(err, StoreError::NoSuchKey { .. }), "{err}");
        assert!(err.is_not_found());

        let err = store.get_object("docs", "a.txt").await.err().unwrap();
        assert!(matches!(err, StoreError::NoSuchKey { .. }), "{err}");
    }

    #[tokio::test]
    async fn test_truncated_listing_projection() {
        let store = fake_store().await;

        let list = store
            .list_objects(&ListObjectsRequest {
                bucket: "docs".to_string(),
                prefix: None,
                start_after: Some("a.txt".to_string()),
                delimiter: Some("/".to_string()),
                max_keys: 2,
            })
            .await
            .unwrap();

        assert_eq!(list.key_count, 2);
        assert_eq!(list.start_after, "a.txt");
        assert!(list.is_truncated);
        assert_eq!(list.objects.len(), 1);
        let object = &list.objects[0];
        assert_eq!(object.name, "b.txt");
        assert_eq!(object.size, 42);
        assert_eq!(object.owner_id, "owner-1");
        assert_eq!(object.owner_name, "Owner One");
        assert_eq!(object.storage_class, "STANDARD");
        assert_eq!(
            object.last_modified.unwrap().to_rfc3339(),
            "2024-01-02T03:04:05+00:00"
        );
        assert_eq!(list.directories, ["img/"]);
        assert_eq!(list.next_start_after, None);
        assert_eq!(list.next_cursor(), Some(format!("img/{}", char::MAX)));
    }

    #[tokio::test]
    async fn test_bucket_acl_projection() {
        let store = fake_store().await;

        let acl = store.get_bucket_acl("docs").await.unwrap();
        assert_eq!(acl.owner.id.as_deref(), Some("owner-1"));
        assert_eq!(acl.owner.display_name.as_deref(), Some("Owner One"));
        assert_eq!(acl.grants.len(), 2);

        let owner = &acl.grants[0];
        assert_eq!(owner.permission, "FULL_CONTROL");
        assert_eq!(owner.grantee.grantee_type, "CanonicalUser");
        assert_eq!(owner.grantee.id.as_deref(), Some("owner-1"));
        assert_eq!(owner.grantee.uri, None);

        let public = &acl.grants[1];
        assert_eq!(public.permission, "READ");
        assert_eq!(public.grantee.grantee_type, "Group");
        assert_eq!(
            public.grantee.uri.as_deref(),
            Some("http://acs.amazonaws.com/groups/global/AllUsers")
        );
        assert_eq!(public.grantee.id, None);
    }

    #[test]
    fn test_to_utc() {
        let dt = SdkDateTime::from_secs(1_700_000_000);
        assert_eq!(to_utc(&dt).unwrap().timestamp(), 1_700_000_000);
    }
}
