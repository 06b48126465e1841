//! Bucket handlers

use axum::extract::State;
use s3console_common::{Bucket, WaitFailurePolicy};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{Result, connect, store_error};
use crate::envelope::Envelope;
use crate::error::ConsoleError;
use crate::request::{BucketRequest, RawBody, UserQuery, parse, required};
use crate::state::AppState;

/// POST /s3/bucket/list
pub async fn list_buckets(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
) -> Result<Envelope<Vec<Bucket>>> {
    const OP: &str = "list_buckets";

    let store = connect(&state, &query, OP).await?;
    let buckets = store
        .list_buckets()
        .await
        .map_err(store_error(OP, "failed to list buckets"))?;

    Ok(Envelope::data(buckets))
}

/// POST /s3/bucket/create
pub async fn create_bucket(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<()>> {
    const OP: &str = "create_bucket";

    let req: BucketRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;

    let store = connect(&state, &query, OP).await?;
    store
        .create_bucket(&bucket)
        .await
        .map_err(store_error(OP, "failed to create bucket"))?;

    info!("Created bucket {} for user {}", bucket, query.user_id());
    Ok(Envelope::ok())
}

/// POST /s3/bucket/delete
///
/// Deletes the bucket, then waits for the store to stop reporting it.
pub async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<()>> {
    const OP: &str = "delete_bucket";

    let req: BucketRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;

    let store = connect(&state, &query, OP).await?;
    store
        .delete_bucket(&bucket)
        .await
        .map_err(store_error(OP, "failed to delete bucket"))?;

    if let Err(e) = store
        .wait_until_bucket_not_exists(&bucket, state.settings.delete_wait())
        .await
    {
        match state.settings.delete_wait_failure {
            WaitFailurePolicy::LogAndContinue => {
                warn!("{}: bucket {} deletion not confirmed: {}", OP, bucket, e);
            }
            WaitFailurePolicy::Fail => {
                error!("{}: bucket {} deletion not confirmed: {}", OP, bucket, e);
                return Err(ConsoleError::upstream("bucket deletion not confirmed"));
            }
        }
    }

    info!("Deleted bucket {} for user {}", bucket, query.user_id());
    Ok(Envelope::ok())
}
