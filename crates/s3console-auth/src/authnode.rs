//! Auth node capability lookup
//!
//! The console authenticates to the auth node with its own service identity
//! and asks for the capabilities of the requesting user. The answer carries
//! the user's scoped S3 key pair.
//!
//! Wire format: `POST {endpoint}/admin/getcaps` with
//! `{"serviceId", "serviceKey", "userId"}`, answered by
//! `{"accessKey", "secretKey"}` on success.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use s3console_common::Credentials;
use std::time::Duration;

use crate::error::AuthError;
use crate::resolver::CredentialResolver;

/// Path of the capability lookup on the auth node
pub const GET_CAPS_PATH: &str = "/admin/getcaps";

/// Auth node connection settings
#[derive(Clone)]
pub struct AuthNodeConfig {
    /// Auth node base URL
    pub endpoint: String,
    /// Service identity presented by the console
    pub service_id: String,
    pub service_key: String,
    /// Timeout for one lookup
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetCapsRequest<'a> {
    service_id: &'a str,
    service_key: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetCapsResponse {
    #[serde(default)]
    access_key: String,
    #[serde(default)]
    secret_key: String,
}

/// Resolver backed by the external auth node
pub struct AuthNodeResolver {
    config: AuthNodeConfig,
    http_client: reqwest::Client,
}

impl AuthNodeResolver {
    /// Create a new auth node resolver
    pub fn new(config: AuthNodeConfig) -> Result<Self, AuthError> {
        if config.endpoint.is_empty() {
            return Err(AuthError::Configuration(
                "auth node endpoint is empty".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuthError::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Fetch the scoped key pair for `user_id` from the auth node
    pub async fn get_caps(&self, user_id: &str) -> Result<Credentials, AuthError> {
        if user_id.is_empty() {
            return Err(AuthError::MissingUserId);
        }

        let url = format!(
            "{}{}",
            self.config.endpoint.trim_end_matches('/'),
            GET_CAPS_PATH
        );

        let request = GetCapsRequest {
            service_id: &self.config.service_id,
            service_key: &self.config.service_key,
            user_id,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Timeout
                } else {
                    AuthError::Unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected {
                user_id: user_id.to_string(),
                status: response.status().as_u16(),
            });
        }

        let caps: GetCapsResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        if caps.access_key.is_empty() || caps.secret_key.is_empty() {
            return Err(AuthError::InvalidResponse(format!(
                "no key pair for user {user_id}"
            )));
        }

        Ok(Credentials::new(caps.access_key, caps.secret_key))
    }
}

#[async_trait]
impl CredentialResolver for AuthNodeResolver {
    fn name(&self) -> &str {
        "authnode"
    }

    async fn resolve(&self, user_id: &str) -> Result<Credentials, AuthError> {
        let creds = self.get_caps(user_id).await?;
        tracing::debug!("Resolved credentials for user {} from auth node", user_id);
        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};
    use std::net::SocketAddr;

    async fn get_caps(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body["serviceId"] != "console" || body["serviceKey"] != "console-key" {
            return (StatusCode::FORBIDDEN, Json(json!({})));
        }
        match body["userId"].as_str() {
            Some("alice") => (
                StatusCode::OK,
                Json(json!({"accessKey": "alice-ak", "secretKey": "alice-sk"})),
            ),
            Some("keyless") => (StatusCode::OK, Json(json!({"accessKey": ""}))),
            Some("slow") => {
                tokio::time::sleep(Duration::from_secs(2)).await;
                (StatusCode::OK, Json(json!({})))
            }
            _ => (StatusCode::NOT_FOUND, Json(json!({}))),
        }
    }

    async fn spawn_auth_node() -> SocketAddr {
        let app = Router::new().route(GET_CAPS_PATH, post(get_caps));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn resolver(endpoint: String, service_key: &str) -> AuthNodeResolver {
        AuthNodeResolver::new(AuthNodeConfig {
            endpoint,
            service_id: "console".to_string(),
            service_key: service_key.to_string(),
            timeout: Duration::from_millis(300),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_known_user() {
        let addr = spawn_auth_node().await;
        let resolver = resolver(format!("http://{addr}/"), "console-key");

        let creds = resolver.resolve("alice").await.unwrap();
        assert_eq!(creds, Credentials::new("alice-ak", "alice-sk"));
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let addr = spawn_auth_node().await;
        let resolver = resolver(format!("http://{addr}"), "console-key");

        let err = resolver.resolve("mallory").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_wrong_service_identity_is_rejected() {
        let addr = spawn_auth_node().await;
        let resolver = resolver(format!("http://{addr}"), "wrong-key");

        let err = resolver.resolve("alice").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_missing_keys_are_invalid() {
        let addr = spawn_auth_node().await;
        let resolver = resolver(format!("http://{addr}"), "console-key");

        let err = resolver.resolve("keyless").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_auth_node_times_out() {
        let addr = spawn_auth_node().await;
        let resolver = resolver(format!("http://{addr}"), "console-key");

        let err = resolver.resolve("slow").await.unwrap_err();
        assert!(matches!(err, AuthError::Timeout));
    }

    #[tokio::test]
    async fn test_unreachable_auth_node() {
        // Bind and drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let resolver = resolver(format!("http://{addr}"), "console-key");
        let err = resolver.resolve("alice").await.unwrap_err();
        assert!(matches!(err, AuthError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_user_id_skips_lookup() {
        let resolver = resolver("http://127.0.0.1:1".to_string(), "console-key");

        let err = resolver.resolve("").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingUserId));
    }

    #[test]
    fn test_empty_endpoint_is_a_configuration_error() {
        let result = AuthNodeResolver::new(AuthNodeConfig {
            endpoint: String::new(),
            service_id: "console".to_string(),
            service_key: String::new(),
            timeout: Duration::from_secs(1),
        });
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }
}
