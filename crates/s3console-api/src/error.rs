//! Console error type and its JSON envelope

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Failure classes reported to the console
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ParamMissing,
    ParamParse,
    AuthLookup,
    NotFound,
    NotImplemented,
    Upstream,
}

impl ErrorKind {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::ParamMissing | Self::ParamParse => StatusCode::BAD_REQUEST,
            Self::AuthLookup => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Error returned by a handler.
///
/// The message is fixed per operation; the underlying cause is logged by the
/// handler and never sent to the client.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct ConsoleError {
    pub kind: ErrorKind,
    pub message: &'static str,
}

impl ConsoleError {
    #[must_use]
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    #[must_use]
    pub const fn param_missing(message: &'static str) -> Self {
        Self::new(ErrorKind::ParamMissing, message)
    }

    #[must_use]
    pub const fn param_parse(message: &'static str) -> Self {
        Self::new(ErrorKind::ParamParse, message)
    }

    #[must_use]
    pub const fn auth_lookup(message: &'static str) -> Self {
        Self::new(ErrorKind::AuthLookup, message)
    }

    #[must_use]
    pub const fn not_found(message: &'static str) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    #[must_use]
    pub const fn not_implemented(message: &'static str) -> Self {
        Self::new(ErrorKind::NotImplemented, message)
    }

    #[must_use]
    pub const fn upstream(message: &'static str) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    code: ErrorKind,
    message: &'static str,
}

impl IntoResponse for ConsoleError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            code: self.kind,
            message: self.message,
        };
        (self.kind.status(), Json(body)).into_response()
    }
}
