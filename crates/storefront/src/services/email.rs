//! Transactional email API client.
//!
//! Sends HTML mail through a Resend-compatible HTTP API
//! (`POST {api_url}/emails` with a bearer key).

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use wholesale_core::Email;

use crate::config::EmailConfig;

/// Request timeout for the email API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to build the request or parse the response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// An email ready to send.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Email,
    pub subject: String,
    pub html: String,
}

/// Email API client.
#[derive(Clone)]
pub struct EmailClient {
    inner: Arc<EmailClientInner>,
}

struct EmailClientInner {
    client: reqwest::Client,
    endpoint: url::Url,
    from: String,
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    #[serde(default)]
    id: Option<String>,
}

impl EmailClient {
    /// Create a new email client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();
        let mut auth_value =
            HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .map_err(|e| EmailError::Parse(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        // Join relative to the configured URL, keeping any path prefix.
        let mut base = config.api_url.clone();
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let endpoint = base
            .join("emails")
            .map_err(|e| EmailError::Parse(format!("Invalid API URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(EmailClientInner {
                client,
                endpoint,
                from: config.from.clone(),
            }),
        })
    }

    /// Sender shown on outgoing mail.
    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.inner.from
    }

    /// Send one email. Returns the provider's message id when it gives one.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects the message.
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    pub async fn send(&self, email: &OutgoingEmail) -> Result<Option<String>, EmailError> {
        let body = SendEmailRequest {
            from: &self.inner.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .inner
            .client
            .post(self.inner.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), %message, "Email API rejected message");
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| EmailError::Parse(e.to_string()))?;

        tracing::info!(message_id = ?sent.id, "Email sent");
        Ok(sent.id)
    }
}
