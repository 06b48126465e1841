//! s3console HTTP API
//!
//! JSON routes used by the web console for bucket, object, ACL and folder
//! management. Every route except `/health` takes the caller's identity in the
//! `userId` query parameter and answers with a uniform envelope:
//!
//! - success: `{"status":"ok"}`
//! - data: `{"status":"ok","data":...}`
//! - error: `{"status":"error","code":"<kind>","message":"..."}`
//!
//! Object downloads are the exception and stream the raw bytes.

pub mod envelope;
pub mod error;
pub mod handlers;
pub mod request;
pub mod state;

pub use envelope::Envelope;
pub use error::{ConsoleError, ErrorKind};
pub use state::AppState;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use handlers::{acl, bucket, folder, object};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the console router
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Buckets
        .route("/s3/bucket/list", post(bucket::list_buckets))
        .route("/s3/bucket/create", post(bucket::create_bucket))
        .route("/s3/bucket/delete", post(bucket::delete_bucket))
        .route("/s3/bucket/acl/get", post(acl::get_bucket_acl))
        .route("/s3/bucket/acl/set", post(acl::set_bucket_acl))
        // Objects
        .route("/s3/object/put", post(object::put_object))
        .route("/s3/object/get", post(object::get_object))
        .route("/s3/object/delete", post(object::delete_object))
        .route("/s3/object/list", post(object::list_objects))
        .route("/s3/object/url/create", post(object::create_object_url))
        .route("/s3/object/url/get", post(object::get_object_url))
        .route("/s3/object/acl/get", post(acl::get_object_acl))
        .route("/s3/object/acl/set", post(acl::set_object_acl))
        // Folders
        .route("/s3/folder/create", post(folder::create_folder))
        .route("/s3/folder/list", post(folder::list_folder))
        .route("/s3/folder/delete", post(folder::delete_folder))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
