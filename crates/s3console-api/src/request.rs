//! Request schemas and parameter extraction
//!
//! Every field is optional at the serde level so that an absent field is
//! reported as a missing parameter rather than a decode failure.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use s3console_common::CannedAcl;
use s3console_common::config::MAX_LIST_KEYS;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::ConsoleError;

/// Query string carried by every console route
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub user_id: Option<String>,
}

impl UserQuery {
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for UserQuery {
    type Rejection = ConsoleError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<Self>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                warn!("Rejected query string {:?}: {}", parts.uri.query(), e);
                ConsoleError::param_parse("invalid query string")
            })?;
        Ok(query)
    }
}

/// Buffered request body; buffering failures become error envelopes
#[derive(Debug)]
pub struct RawBody(pub Bytes);

impl<S: Send + Sync> FromRequest<S> for RawBody {
    type Rejection = ConsoleError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            warn!("Failed to read request body: {}", e);
            if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                ConsoleError::param_parse("request body too large")
            } else {
                ConsoleError::param_parse("invalid request body")
            }
        })?;
        Ok(Self(body))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRequest {
    pub bucket_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketAclRequest {
    pub bucket_name: Option<String>,
    pub acl: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRequest {
    pub bucket_name: Option<String>,
    pub object_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectAclRequest {
    pub bucket_name: Option<String>,
    pub object_name: Option<String>,
    pub acl: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUrlRequest {
    pub bucket_name: Option<String>,
    pub object_name: Option<String>,
    /// Lifetime of a presigned URL in seconds, number or numeric string
    pub expires_in: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsRequest {
    pub bucket_name: Option<String>,
    pub prefix: Option<String>,
    pub start_after: Option<String>,
    /// Number or numeric string
    pub max_keys: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRequest {
    pub bucket_name: Option<String>,
    pub folder_name: Option<String>,
    pub parent_name: Option<String>,
}

/// Decode a JSON request body; an empty body decodes as `{}`
pub fn parse<T: DeserializeOwned + Default>(
    op: &'static str,
    body: &Bytes,
) -> Result<T, ConsoleError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        warn!("{}: failed to decode request body: {}", op, e);
        ConsoleError::param_parse("invalid request body")
    })
}

/// Take a required, non-empty string field
pub fn required(value: Option<String>, message: &'static str) -> Result<String, ConsoleError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConsoleError::param_missing(message)),
    }
}

/// Parse the optional canned ACL, `private` when absent
pub fn canned_acl(value: Option<&str>) -> Result<CannedAcl, ConsoleError> {
    match value {
        None | Some("") => Ok(CannedAcl::default()),
        Some(s) => s
            .parse()
            .map_err(|_| ConsoleError::param_parse("unknown canned acl")),
    }
}

/// Resolve the requested page size.
///
/// Absent means `default`. Values that are not a positive integer fall back
/// to `default` with a warning; values above the store limit are capped.
#[must_use]
pub fn max_keys(value: Option<&Value>, default: i32) -> i32 {
    let parsed = match value {
        None | Some(Value::Null) => return default,
        Some(Value::String(s)) if s.trim().is_empty() => return default,
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        Some(_) => None,
    };

    match parsed {
        Some(n) if n > 0 => i32::try_from(n.min(i64::from(MAX_LIST_KEYS))).unwrap_or(default),
        _ => {
            warn!(
                "Invalid maxKeys {:?}, using default of {}",
                value.map(ToString::to_string),
                default
            );
            default
        }
    }
}

/// Resolve a presigned URL lifetime in seconds.
///
/// Absent or empty means `default`; anything that is not an integer in
/// `1..=max` is rejected.
pub fn expires_in(value: Option<&Value>, default: u64, max: u64) -> Result<u64, ConsoleError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(default),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        Some(_) => None,
    };

    match parsed {
        Some(secs) if (1..=max).contains(&secs) => Ok(secs),
        _ => {
            warn!(
                "Invalid expiresIn {:?}, allowed range is 1..={}",
                value.map(ToString::to_string),
                max
            );
            Err(ConsoleError::param_parse("expiresIn out of range"))
        }
    }
}

/// Key of a folder marker: `parent/` + `folder/`
#[must_use]
pub fn folder_key(parent: &str, folder: &str) -> String {
    let mut key = String::with_capacity(parent.len() + folder.len() + 2);
    key.push_str(parent);
    if !parent.is_empty() && !parent.ends_with('/') {
        key.push('/');
    }
    key.push_str(folder);
    if !folder.ends_with('/') {
        key.push('/');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_empty_body() {
        let req: BucketRequest = parse("test", &Bytes::new()).unwrap();
        assert!(req.bucket_name.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        let err = parse::<BucketRequest>("test", &Bytes::from_static(b"{not json")).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ParamParse);

        let err =
            parse::<BucketRequest>("test", &Bytes::from_static(br#"{"bucketName": 5}"#)).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ParamParse);
    }

    #[test]
    fn test_required() {
        assert_eq!(required(Some("docs".to_string()), "m").unwrap(), "docs");
        assert!(required(Some(String::new()), "m").is_err());
        assert!(required(None, "m").is_err());
    }

    #[test]
    fn test_canned_acl() {
        assert_eq!(canned_acl(None).unwrap(), CannedAcl::Private);
        assert_eq!(canned_acl(Some("public-read")).unwrap(), CannedAcl::PublicRead);
        assert!(canned_acl(Some("everyone")).is_err());
    }

    #[test]
    fn test_max_keys() {
        assert_eq!(max_keys(None, 1000), 1000);
        assert_eq!(max_keys(Some(&json!(50)), 1000), 50);
        assert_eq!(max_keys(Some(&json!("25")), 1000), 25);
        assert_eq!(max_keys(Some(&json!("abc")), 1000), 1000);
        assert_eq!(max_keys(Some(&json!(0)), 1000), 1000);
        assert_eq!(max_keys(Some(&json!(-3)), 1000), 1000);
        assert_eq!(max_keys(Some(&json!(2.5)), 1000), 1000);
        assert_eq!(max_keys(Some(&json!(5000)), 1000), 1000);
        assert_eq!(max_keys(Some(&json!(true)), 200), 200);
    }

    #[test]
    fn test_expires_in() {
        assert_eq!(expires_in(None, 3600, 7200).unwrap(), 3600);
        assert_eq!(expires_in(Some(&json!(600)), 3600, 7200).unwrap(), 600);
        assert_eq!(expires_in(Some(&json!("600")), 3600, 7200).unwrap(), 600);
        assert_eq!(expires_in(Some(&json!("")), 3600, 7200).unwrap(), 3600);
        assert!(expires_in(Some(&json!(0)), 3600, 7200).is_err());
        assert!(expires_in(Some(&json!(-5)), 3600, 7200).is_err());
        assert!(expires_in(Some(&json!("soon")), 3600, 7200).is_err());
        assert!(expires_in(Some(&json!(7201)), 3600, 7200).is_err());
    }

    #[test]
    fn test_folder_key() {
        assert_eq!(folder_key("", "photos"), "photos/");
        assert_eq!(folder_key("", "photos/"), "photos/");
        assert_eq!(folder_key("albums", "2024"), "albums/2024/");
        assert_eq!(folder_key("albums/", "2024/"), "albums/2024/");
    }
}
