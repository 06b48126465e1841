//! Folder handlers
//!
//! A folder is a zero-byte object whose key ends with `/`.

use axum::extract::State;
use s3console_store::ObjectSource;
use std::sync::Arc;
use tracing::info;

use super::{Result, connect, store_error};
use crate::envelope::Envelope;
use crate::error::ConsoleError;
use crate::request::{FolderRequest, RawBody, UserQuery, folder_key, parse, required};
use crate::state::AppState;

/// POST /s3/folder/create
///
/// `parentName` must be present but may be empty for the bucket root. The
/// parent is not checked for existence.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    query: UserQuery,
    RawBody(body): RawBody,
) -> Result<Envelope<()>> {
    const OP: &str = "create_folder";

    let req: FolderRequest = parse(OP, &body)?;
    let bucket = required(req.bucket_name, "bucketName is required")?;
    let folder = required(req.folder_name, "folderName is required")?;
    let parent = req
        .parent_name
        .ok_or(ConsoleError::param_missing("parentName is required"))?;
    let key = folder_key(&parent, &folder);

    let store = connect(&state, &query, OP).await?;
    store
        .put_object(&bucket, &key, ObjectSource::Empty)
        .await
        .map_err(store_error(OP, "failed to create folder"))?;

    info!("Created folder {}/{} for user {}", bucket, key, query.user_id());
    Ok(Envelope::ok())
}

/// POST /s3/folder/list
pub async fn list_folder() -> ConsoleError {
    ConsoleError::not_implemented("folder listing is not implemented")
}

/// POST /s3/folder/delete
pub async fn delete_folder() -> ConsoleError {
    ConsoleError::not_implemented("folder deletion is not implemented")
}
