//! Auth API: sign-in, token validation and invitations.
//!
//! Session issuance and JWT validation stay with the backend; these calls
//! only move tokens between the browser session and the auth service.

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use wholesale_core::{Email, UserId};

use super::{SupabaseClient, SupabaseError, check_status, decode_error, read_json};

/// Tokens issued by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Unix timestamp at which the access token expires.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp() + self.expires_in)
    }
}

/// The authenticated user as seen by the auth service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Kind of one-time token carried by an email link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Invite,
    Recovery,
    Magiclink,
    Signup,
    Email,
    EmailChange,
}

impl std::str::FromStr for OtpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invite" => Ok(Self::Invite),
            "recovery" => Ok(Self::Recovery),
            "magiclink" => Ok(Self::Magiclink),
            "signup" => Ok(Self::Signup),
            "email" => Ok(Self::Email),
            "email_change" => Ok(Self::EmailChange),
            _ => Err(format!("invalid link type: {s}")),
        }
    }
}

impl SupabaseClient {
    /// Exchange an email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` when the pair is rejected, or another
    /// error if the request fails.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, SupabaseError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        let response = self
            .request(Method::POST, url, self.anon_key())
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(SupabaseError::InvalidCredentials)
            }
            _ => read_json(response).await,
        }
    }

    /// Trade a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the refresh token is no longer valid.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, SupabaseError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");

        let response = self
            .request(Method::POST, url, self.anon_key())
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        reject_client_errors(response).await
    }

    /// Validate an access token and return its user.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the token is expired or invalid.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, SupabaseError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .request(Method::GET, url, access_token)
            .send()
            .await?;

        reject_client_errors(response).await
    }

    /// Verify the token hash from an invitation or recovery link.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the link is invalid or expired.
    #[instrument(skip(self, token_hash))]
    pub async fn verify_otp(
        &self,
        token_hash: &str,
        otp_type: OtpType,
    ) -> Result<AuthSession, SupabaseError> {
        let url = self.endpoint("auth/v1/verify")?;
        let body = serde_json::json!({ "type": otp_type, "token_hash": token_hash });
        let response = self
            .request(Method::POST, url, self.anon_key())
            .json(&body)
            .send()
            .await?;

        reject_client_errors(response).await
    }

    /// Set a new password for the token's user.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the password is refused.
    #[instrument(skip_all)]
    pub async fn update_password(
        &self,
        access_token: &str,
        password: &SecretString,
    ) -> Result<AuthUser, SupabaseError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .request(Method::PUT, url, access_token)
            .json(&serde_json::json!({ "password": password.expose_secret() }))
            .send()
            .await?;

        read_json(response).await
    }

    /// Revoke the token's session.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self
            .request(Method::POST, url, access_token)
            .send()
            .await?;

        check_status(response).await.map(|_| ())
    }

    /// Email an invitation link that lands on `redirect_to`.
    ///
    /// Requires the service key.
    ///
    /// # Errors
    ///
    /// Returns `MissingServiceKey` without a service key, or an API error if
    /// the address is already registered or the request fails.
    #[instrument(skip(self))]
    pub async fn invite_user_by_email(
        &self,
        email: &Email,
        redirect_to: &str,
    ) -> Result<AuthUser, SupabaseError> {
        let service_key = self.service_key()?;
        let mut url = self.endpoint("auth/v1/invite")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);

        let response = self
            .request(Method::POST, url, service_key)
            .json(&serde_json::json!({ "email": email.as_str() }))
            .send()
            .await?;

        read_json(response).await
    }
}

/// Parse a session-bearing response, treating every 4xx as a rejected token.
async fn reject_client_errors<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SupabaseError> {
    let status = response.status();
    if status.is_client_error() {
        let body = response.text().await.unwrap_or_default();
        let message = match decode_error(status, &body) {
            SupabaseError::Api { message, .. } | SupabaseError::Unauthorized(message) => message,
            other => other.to_string(),
        };
        return Err(SupabaseError::Unauthorized(message));
    }
    read_json(response).await
}
