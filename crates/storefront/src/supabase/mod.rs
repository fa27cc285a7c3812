//! Supabase client.
//!
//! Talks to two services of one Supabase project over plain HTTP with
//! `reqwest` 0.13:
//!
//! - `PostgREST` (`/rest/v1`) for the `products` and `cart_items` tables,
//!   see [`SupabaseStore`]
//! - `GoTrue` (`/auth/v1`) for email and password accounts, see
//!   [`SupabaseAuth`]
//!
//! Table requests carry the service key; auth requests carry the anon key.

mod gotrue;
mod query;
mod rest;
mod rows;

pub use gotrue::SupabaseAuth;
pub use rest::SupabaseStore;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::SupabaseConfig;
use crate::store::BackendError;

/// Longest slice of a response body written to the logs.
const LOGGED_BODY_CHARS: usize = 500;

/// Postgres SQLSTATE for a foreign key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

// =============================================================================
// SupabaseClient
// =============================================================================

/// Shared HTTP client for one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
    service_key: SecretString,
}

/// Status and raw body of a completed request.
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl SupabaseClient {
    /// Create a new client for the configured project.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            inner: Arc::new(SupabaseClientInner {
                client: reqwest::Client::new(),
                base_url: with_trailing_slash(config.url.clone()),
                anon_key: config.anon_key.clone(),
                service_key: config.service_key.clone(),
            }),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| BackendError::Unavailable(format!("invalid Supabase URL for {path}: {e}")))
    }

    /// Request against a `PostgREST` table, authorized with the service key.
    pub(crate) fn table(&self, method: Method, table: &str) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let key = self.inner.service_key.expose_secret();
        Ok(self
            .inner
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key))
    }

    /// Request against a `GoTrue` endpoint, identified by the anon key.
    pub(crate) fn auth(&self, method: Method, path: &str) -> Result<RequestBuilder, BackendError> {
        let url = self.endpoint(&format!("auth/v1/{path}"))?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.anon_key))
    }

    /// Send a request and read the whole body, whatever the status.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<RawResponse, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    /// Send a request and fail on any non-success status.
    pub(crate) async fn send_ok(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<String, BackendError> {
        let raw = self.send(request).await?;
        if raw.status.is_success() {
            return Ok(raw.body);
        }

        tracing::error!(
            status = %raw.status,
            body = %truncate(&raw.body),
            context,
            "Supabase returned non-success status"
        );
        Err(raw.into_error())
    }
}

impl RawResponse {
    pub(crate) fn into_error(self) -> BackendError {
        let body = ServiceErrorBody::parse(&self.body);
        if body.sqlstate() == Some(FOREIGN_KEY_VIOLATION) {
            return BackendError::UnknownReference(body.message().unwrap_or_default());
        }
        let message = body
            .message()
            .unwrap_or_else(|| {
                self.status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        BackendError::service(self.status.as_u16(), message)
    }
}

/// Decode a JSON body, logging it when it does not match.
pub(crate) fn decode<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %truncate(body),
            context,
            "Failed to parse Supabase response"
        );
        BackendError::Parse(e)
    })
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn truncate(body: &str) -> String {
    body.chars().take(LOGGED_BODY_CHARS).collect()
}

// =============================================================================
// Error Bodies
// =============================================================================

/// Error body of either service.
///
/// `PostgREST` sends `{code, message, details, hint}`. `GoTrue` sends
/// `{code, error_code, msg}` on current versions and
/// `{error, error_description}` on the token endpoint of older ones.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ServiceErrorBody {
    /// SQLSTATE string from `PostgREST`, numeric status from `GoTrue`.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl ServiceErrorBody {
    /// Parse leniently; an unreadable body yields no fields.
    pub(crate) fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub(crate) fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }

    /// Machine-readable code, from whichever field carries it.
    pub(crate) fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    fn sqlstate(&self) -> Option<&str> {
        self.code.as_ref().and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(url: &str) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse(url).unwrap(),
            anon_key: "anon".to_string(),
            service_key: SecretString::from("service"),
        })
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        for base in ["https://proxy.example.com/supabase", "https://proxy.example.com/supabase/"] {
            assert_eq!(
                client(base).endpoint("rest/v1/products").unwrap().as_str(),
                "https://proxy.example.com/supabase/rest/v1/products"
            );
        }
        assert_eq!(
            client("https://abc.supabase.co").endpoint("auth/v1/user").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/user"
        );
    }

    #[test]
    fn test_error_body_postgrest() {
        let body = ServiceErrorBody::parse(
            r#"{"code":"23503","details":null,"hint":null,"message":"violates foreign key constraint"}"#,
        );
        assert_eq!(body.message().as_deref(), Some("violates foreign key constraint"));
        assert_eq!(body.code(), None);
    }

    #[test]
    fn test_error_body_gotrue() {
        let body = ServiceErrorBody::parse(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert_eq!(body.message().as_deref(), Some("Invalid login credentials"));
        assert_eq!(body.code(), Some("invalid_credentials"));

        let legacy = ServiceErrorBody::parse(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(legacy.message().as_deref(), Some("Invalid login credentials"));
        assert_eq!(legacy.code(), Some("invalid_grant"));
    }

    #[test]
    fn test_foreign_key_violation_is_unknown_reference() {
        let raw = RawResponse {
            status: StatusCode::CONFLICT,
            body: r#"{"code":"23503","details":"Key is not present in table \"products\".","hint":null,"message":"insert or update on table \"cart_items\" violates foreign key constraint"}"#.to_string(),
        };
        assert!(matches!(raw.into_error(), BackendError::UnknownReference(_)));

        let gotrue = RawResponse {
            status: StatusCode::BAD_REQUEST,
            body: r#"{"code":400,"error_code":"validation_failed","msg":"bad"}"#.to_string(),
        };
        assert!(matches!(gotrue.into_error(), BackendError::Service { status: 400, .. }));
    }

    #[test]
    fn test_into_error_falls_back_to_reason() {
        let raw = RawResponse {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "<html>upstream down</html>".to_string(),
        };
        let err = raw.into_error();
        assert_eq!(err.to_string(), "service error (503): Service Unavailable");
    }
}
