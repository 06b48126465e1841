//! Success envelopes

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// `{"status":"ok"}`, optionally with a `data` payload
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl Envelope<()> {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            status: "ok",
            data: None,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub const fn data(data: T) -> Self {
        Self {
            status: "ok",
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
