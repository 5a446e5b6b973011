//! Backend-as-a-service client (Supabase REST, auth and storage APIs).
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the project's HTTP surface; no SDK
//! - The backend is the source of truth; nothing is cached locally
//! - Table access goes through [`Tables`], which is scoped to one access
//!   token so row-level security applies to every query
//!
//! # APIs
//!
//! ## REST (`/rest/v1`)
//! - Table reads, inserts, upserts, updates and deletes
//! - The `get_user_role` remote procedure
//!
//! ## Auth (`/auth/v1`)
//! - Password sign-in, token refresh and validation
//! - One-time-token verification for invitation links
//! - Invitations (service key only)
//!
//! ## Storage (`/storage/v1`)
//! - Product image uploads and public URLs
//!
//! # Example
//!
//! ```rust,ignore
//! use wholesale_storefront::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//! let session = client.sign_in_with_password(&email, &password).await?;
//!
//! let tables = client.tables(&session.access_token);
//! let categories = tables.categories().await?;
//! ```

mod auth;
mod query;
mod storage;
mod tables;
pub mod types;

pub use auth::{AuthSession, AuthUser, OtpType};
pub use query::Query;
pub use tables::Tables;
pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::SupabaseConfig;

/// Request timeout for every backend call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when interacting with the backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The access token was rejected (expired, revoked or malformed).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Email/password combination was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An admin operation was attempted without a service key.
    #[error("SUPABASE_SERVICE_ROLE_KEY is not configured")]
    MissingServiceKey,

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SupabaseError {
    /// Whether the error means the caller's token is no longer valid.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Client for the backend-as-a-service HTTP APIs.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    service_role_key: Option<SecretString>,
}

impl SupabaseClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                base_url: config.url.as_str().trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
            }),
        })
    }

    /// Table access under a user's access token (row-level security applies).
    #[must_use]
    pub fn tables<'a>(&'a self, access_token: &'a str) -> Tables<'a> {
        Tables::new(self, access_token)
    }

    /// Table access under the service key (bypasses row-level security).
    ///
    /// # Errors
    ///
    /// Returns `MissingServiceKey` if no service key is configured.
    pub fn service_tables(&self) -> Result<Tables<'_>, SupabaseError> {
        Ok(Tables::new(self, self.service_key()?))
    }

    /// Whether admin operations (invitations) are available.
    #[must_use]
    pub fn has_service_key(&self) -> bool {
        self.inner.service_role_key.is_some()
    }

    /// Check that the REST endpoint answers.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the endpoint returns non-success.
    pub async fn health(&self) -> Result<(), SupabaseError> {
        let url = self.endpoint("rest/v1/")?;
        let response = self
            .request(Method::GET, url, self.anon_key())
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }

    /// Public project URL without a trailing slash.
    fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn anon_key(&self) -> &str {
        self.inner.anon_key.expose_secret()
    }

    fn service_key(&self) -> Result<&str, SupabaseError> {
        self.inner
            .service_role_key
            .as_ref()
            .map(|key| key.expose_secret())
            .ok_or(SupabaseError::MissingServiceKey)
    }

    /// Build an absolute URL for a path below the project URL.
    fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url(),
            path.trim_start_matches('/')
        ))?)
    }

    /// Start a request carrying the project key and a bearer token.
    ///
    /// The bearer is the caller's access token for user-scoped calls, or a
    /// project key for anonymous and admin calls.
    fn request(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        let apikey = if self
            .inner
            .service_role_key
            .as_ref()
            .is_some_and(|key| key.expose_secret() == bearer)
        {
            bearer
        } else {
            self.anon_key()
        };

        self.inner
            .client
            .request(method, url)
            .header("apikey", apikey)
            .bearer_auth(bearer)
    }
}

// =============================================================================
// Response Handling
// =============================================================================

/// Error payloads differ per service; this covers REST, auth and storage.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self, raw: &str) -> String {
        let summary = self
            .error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| raw.chars().take(200).collect());

        match self.details {
            Some(details) if !details.is_empty() => format!("{summary} ({details})"),
            _ => summary,
        }
    }
}

/// Convert a non-success response body into an error.
fn decode_error(status: StatusCode, body: &str) -> SupabaseError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .unwrap_or_default()
        .into_message(body);

    if status == StatusCode::UNAUTHORIZED {
        return SupabaseError::Unauthorized(message);
    }

    SupabaseError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Return the response if successful, otherwise decode its error body.
async fn check_status(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(
        status = %status,
        body = %body.chars().take(500).collect::<String>(),
        "Backend returned non-success status"
    );
    Err(decode_error(status, &body))
}

/// Check the status and parse a JSON body.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SupabaseError> {
    let response = check_status(response).await?;
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        SupabaseError::Parse(e.to_string())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rest_error() {
        let body = r#"{"code":"23505","details":"Key (category_name)=(Seeds) already exists.","hint":null,"message":"duplicate key value violates unique constraint"}"#;
        let err = decode_error(StatusCode::CONFLICT, body);
        match err {
            SupabaseError::Api { status, message } => {
                assert_eq!(status, 409);
                assert!(message.starts_with("duplicate key value"));
                assert!(message.contains("already exists"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_auth_error_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token"}"#;
        let err = decode_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.to_string(), "API error: 400 - Invalid Refresh Token");
    }

    #[test]
    fn test_decode_unauthorized() {
        let body = r#"{"code":401,"msg":"invalid JWT: token is expired"}"#;
        let err = decode_error(StatusCode::UNAUTHORIZED, body);
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("token is expired"));
    }

    #[test]
    fn test_decode_non_json_body() {
        let err = decode_error(StatusCode::BAD_GATEWAY, "upstream connect error");
        assert_eq!(err.to_string(), "API error: 502 - upstream connect error");
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let config = SupabaseConfig {
            url: Url::parse("https://abc.supabase.co/").unwrap(),
            anon_key: SecretString::from("anon"),
            service_role_key: None,
        };
        let client = SupabaseClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("/rest/v1/products").unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/products"
        );
        assert!(!client.has_service_key());
        assert!(matches!(
            client.service_tables(),
            Err(SupabaseError::MissingServiceKey)
        ));
    }
}
