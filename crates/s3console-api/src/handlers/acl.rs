//! Bucket and object ACL handlers

use axum::extract::State;
use s3console_common::AccessControlPolicy;
use std::sync::Arc;
use tracing::info;

use super::{Result, connect, store_error};
use crate::envelope::Envelope;
use crate::error::ConsoleError;
use crate::request::{
    BucketAclRequest, BucketRequest, ObjectAclRequest, ObjectRequest, RawBody, UserQuery,
    canned_acl, parse, required,
};
use crate::state::AppState;

/// POST /s3/bucket/acl/get
pub async fn get_bucket_acl(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<AccessControlPolicy>> {
    const OP: &str = "get_bucket_acl";

    let req: BucketRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;

    let store = connect(&state, &query, OP).await?;
    let acl = store
        .get_bucket_acl(&bucket)
        .await
        .map_err(store_error(OP, "failed to get bucket acl"))?;

    Ok(Envelope::data(acl))
}

/// POST /s3/bucket/acl/set
pub async fn set_bucket_acl(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<()>> {
    const OP: &str = "set_bucket_acl";

    let req: BucketAclRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let acl = canned_acl(req.acl.as_deref())?;
    if !acl.applies_to_bucket() {
        return Err(ConsoleError::param_parse("acl cannot be applied to a bucket"));
    }

    let store = connect(&state, &query, OP).await?;
    store
        .put_bucket_acl(&bucket, acl)
        .await
        .map_err(store_error(OP, "failed to set bucket acl"))?;

    info!("Set acl {} on bucket {} for user {}", acl, bucket, query.user_id());
    Ok(Envelope::ok())
}

/// POST /s3/object/acl/get
pub async fn get_object_acl(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<AccessControlPolicy>> {
    const OP: &str = "get_object_acl";

    let req: ObjectRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let key = required(req.object_name, "objectName is required")?;

    let store = connect(&state, &query, OP).await?;
    let acl = store
        .get_object_acl(&bucket, &key)
        .await
        .map_err(store_error(OP, "failed to get object acl"))?;

    Ok(Envelope::data(acl))
}

/// POST /s3/object/acl/set
pub async fn set_object_acl(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<()>> {
    const OP: &str = "set_object_acl";

    let req: ObjectAclRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let key = required(req.object_name, "objectName is required")?;
    let acl = canned_acl(req.acl.as_deref())?;

    let store = connect(&state, &query, OP).await?;
    store
        .put_object_acl(&bucket, &key, acl)
        .await
        .map_err(store_error(OP, "failed to set object acl"))?;

    info!(
        "Set acl {} on object {}/{} for user {}",
        acl,
        bucket,
        key,
        query.user_id()
    );
    Ok(Envelope::ok())
}
