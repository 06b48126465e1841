//! Object handlers: upload, download, delete, listing and URLs

use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use s3console_common::ObjectList;
use s3console_store::ObjectSource;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

use super::{Result, connect, store_error};
use crate::envelope::Envelope;
use crate::error::ConsoleError;
use crate::request::{
    ListObjectsRequest, ObjectRequest, ObjectUrlRequest, RawBody, UserQuery, expires_in, max_keys,
    parse, required,
};
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Payload of the URL operations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

fn form_error(e: &MultipartError) -> ConsoleError {
    warn!("put_object: invalid multipart body: {}", e);
    ConsoleError::param_parse("invalid multipart form")
}

fn spool_error(e: &std::io::Error) -> ConsoleError {
    error!("put_object: failed to spool upload: {}", e);
    ConsoleError::upstream("failed to upload object")
}

/// Copy the file part to a temporary file, returning it with its size
async fn spool(mut field: Field<'_>) -> Result<(NamedTempFile, u64)> {
    let (tmp, file) = tokio::task::spawn_blocking(|| {
        let tmp = NamedTempFile::new()?;
        let file = tmp.reopen()?;
        Ok::<_, std::io::Error>((tmp, file))
    })
    .await
    .map_err(|e| spool_error(&std::io::Error::other(e)))?
    .map_err(|e| spool_error(&e))?;
    let mut file = tokio::fs::File::from_std(file);

    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(|e| form_error(&e))? {
        file.write_all(&chunk).await.map_err(|e| spool_error(&e))?;
        size += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| spool_error(&e))?;

    Ok((tmp, size))
}

/// POST /s3/object/put
///
/// Multipart form with `bucketName`, `objectName` and a `file` part.
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Envelope<()>> {
    const OP: &str = "put_object";

    let mut multipart = multipart.map_err(|e| {
        warn!("{}: not a multipart request: {}", OP, e);
        ConsoleError::param_parse("invalid multipart form")
    })?;

    let mut bucket_name = None;
    let mut object_name = None;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| form_error(&e))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bucketName" => bucket_name = Some(field.text().await.map_err(|e| form_error(&e))?),
            "objectName" => object_name = Some(field.text().await.map_err(|e| form_error(&e))?),
            "file" => upload = Some(spool(field).await?),
            _ => {}
        }
    }

    let bucket = required(bucket_name, "bucketName is required")?;
    let key = required(object_name, "objectName is required")?;
    let (tmp, size) = upload.ok_or(ConsoleError::param_missing("file is required"))?;

    let store = connect(&state, &query, OP).await?;
    let source = ObjectSource::File {
        path: tmp.path().to_path_buf(),
        size,
    };
    let etag = store
        .put_object(&bucket, &key, source)
        .await
        .map_err(store_error(OP, "failed to upload object"))?;

    info!(
        "Put object {}/{} ({} bytes) for user {}, etag {:?}",
        bucket,
        key,
        size,
        query.user_id(),
        etag
    );
    Ok(Envelope::ok())
}

/// POST /s3/object/get
///
/// Checks the object with HEAD first so a missing key yields a 404 envelope
/// instead of a broken stream.
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    headers: HeaderMap,
    RawBody(body): RawBody,
) -> Result<Response> {
    const OP: &str = "get_object";

    let req: ObjectRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let key = required(req.object_name, "objectName is required")?;

    let store = connect(&state, &query, OP).await?;
    let head = store.head_object(&bucket, &key).await.map_err(|e| {
        if e.is_not_found() {
            warn!("{}: {}", OP, e);
            ConsoleError::not_found("object not found")
        } else {
            error!("{}: metadata check failed: {}", OP, e);
            ConsoleError::upstream("failed to get object")
        }
    })?;

    let stream = store
        .get_object(&bucket, &key)
        .await
        .map_err(store_error(OP, "failed to get object"))?;

    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition = format!("attachment; filename=\"{}\"", key.replace('"', "\\\""));
    let disposition = HeaderValue::from_bytes(disposition.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, disposition),
            (CONTENT_LENGTH, HeaderValue::from(head.size)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// POST /s3/object/delete
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<()>> {
    const OP: &str = "delete_object";

    let req: ObjectRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let key = required(req.object_name, "objectName is required")?;

    let store = connect(&state, &query, OP).await?;
    store
        .delete_object(&bucket, &key)
        .await
        .map_err(store_error(OP, "failed to delete object"))?;

    info!("Deleted object {}/{} for user {}", bucket, key, query.user_id());
    Ok(Envelope::ok())
}

/// POST /s3/object/list
///
/// One page of the listing under `prefix`, with `/` as the delimiter.
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<ObjectList>> {
    const OP: &str = "list_objects";

    let req: ListObjectsRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let max_keys = max_keys(req.max_keys.as_ref(), state.settings.default_max_keys);

    let store = connect(&state, &query, OP).await?;
    let mut list = store
        .list_objects(&s3console_store::ListObjectsRequest {
            bucket,
            prefix: req.prefix.filter(|p| !p.is_empty()),
            start_after: req.start_after.filter(|s| !s.is_empty()),
            delimiter: Some("/".to_string()),
            max_keys,
        })
        .await
        .map_err(store_error(OP, "failed to list objects"))?;

    list.next_start_after = list.next_cursor();
    Ok(Envelope::data(list))
}

/// POST /s3/object/url/create
///
/// Presigned GET URL valid for `expiresIn` seconds.
pub async fn create_object_url(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<ObjectUrl>> {
    const OP: &str = "create_object_url";

    let req: ObjectUrlRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let key = required(req.object_name, "objectName is required")?;

    let expires_in = expires_in(
        req.expires_in.as_ref(),
        state.settings.presign_expiry_secs,
        state.settings.max_presign_expiry_secs,
    )?;

    let store = connect(&state, &query, OP).await?;
    let url = store
        .presign_get(&bucket, &key, Duration::from_secs(expires_in))
        .await
        .map_err(store_error(OP, "failed to create object url"))?;

    Ok(Envelope::data(ObjectUrl {
        url,
        expires_in: Some(expires_in),
    }))
}

/// POST /s3/object/url/get
///
/// Unsigned URL of the object; only usable when the object is public.
pub async fn get_object_url(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<ObjectUrl>> {
    const OP: &str = "get_object_url";

    let req: ObjectRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let key = required(req.object_name, "objectName is required")?;

    let store = connect(&state, &query, OP).await?;
    Ok(Envelope::data(ObjectUrl {
        url: store.object_url(&bucket, &key),
        expires_in: None,
    }))
}
