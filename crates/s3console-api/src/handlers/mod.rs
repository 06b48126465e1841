//! Console request handlers
//!
//! Each handler validates its parameters first, then resolves the caller's
//! credentials, then talks to the store. A failure at any step ends the
//! request with an error envelope.

pub mod acl;
pub mod bucket;
pub mod folder;
pub mod object;

use axum::Json;
use s3console_store::{ObjectStore, StoreError};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::error;

use crate::error::ConsoleError;
use crate::request::UserQuery;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ConsoleError>;

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}

/// Resolve the caller's credentials and open a store client bound to them
async fn connect(
    state: &AppState,
    query: &UserQuery,
    op: &'static str,
) -> Result<Arc<dyn ObjectStore>> {
    let credentials = state
        .resolver
        .resolve(query.user_id())
        .await
        .map_err(|e| {
            error!(
                "{}: {} credential lookup for user {:?} failed: {}",
                op,
                state.resolver.name(),
                query.user_id(),
                e
            );
            ConsoleError::auth_lookup("failed to resolve credentials")
        })?;

    state.stores.connect(&credentials).map_err(|e| {
        error!(
            "{}: failed to open {} store client: {}",
            op,
            state.stores.name(),
            e
        );
        ConsoleError::upstream("failed to connect to object store")
    })
}

/// Log a store failure and report it as upstream
fn store_error(op: &'static str, message: &'static str) -> impl FnOnce(StoreError) -> ConsoleError {
    move |e| {
        error!("{}: {}", op, e);
        ConsoleError::upstream(message)
    }
}
