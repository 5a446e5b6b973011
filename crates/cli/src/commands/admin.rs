//! User administration commands.
//!
//! # Usage
//!
//! ```bash
//! wholesale-cli admin invite -e buyer@example.com
//! wholesale-cli admin promote -e owner@example.com
//! wholesale-cli admin group -e buyer@example.com -g 2
//! ```
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Backend project URL
//! - `SUPABASE_ANON_KEY` - Public API key
//! - `SUPABASE_SERVICE_ROLE_KEY` - Service key; every command needs it
//! - `STOREFRONT_BASE_URL` - Base URL for invitation links

use thiserror::Error;
use wholesale_core::{CustomerGroupId, Email, UserRole};
use wholesale_storefront::config::{ConfigError, SupabaseConfig};
use wholesale_storefront::supabase::{SupabaseClient, SupabaseError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Backend settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] SupabaseError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No profile is registered under the address.
    #[error("No user found with email: {0}")]
    UserNotFound(String),
}

/// Connect with the service key from the environment.
fn connect() -> Result<SupabaseClient, AdminError> {
    dotenvy::dotenv().ok();

    let config = SupabaseConfig::from_env()?;
    if config.service_role_key.is_none() {
        return Err(AdminError::MissingEnvVar("SUPABASE_SERVICE_ROLE_KEY"));
    }
    Ok(SupabaseClient::new(&config)?)
}

fn parse_email(email: &str) -> Result<Email, AdminError> {
    Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))
}

/// Where invitation links land.
fn set_password_url(base_url: &str) -> String {
    format!("{}/auth/set-password", base_url.trim_end_matches('/'))
}

/// Email an invitation to a new user.
///
/// # Errors
///
/// Returns error if the configuration is incomplete or the backend rejects
/// the invitation (for example, the address is already registered).
pub async fn invite(email: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let client = connect()?;
    let base_url = std::env::var("STOREFRONT_BASE_URL")
        .map_err(|_| AdminError::MissingEnvVar("STOREFRONT_BASE_URL"))?;

    tracing::info!("Inviting: {}", email);
    let user = client
        .invite_user_by_email(&email, &set_password_url(&base_url))
        .await?;

    tracing::info!("Invitation sent! User ID: {}", user.id);
    tracing::info!("Assign a customer group once they have set a password.");
    Ok(())
}

/// Give an existing user the admin role.
///
/// # Errors
///
/// Returns error if the configuration is incomplete, no user has the
/// address, or the update fails.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let client = connect()?;
    let tables = client.service_tables()?;

    let profile = tables
        .profile_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    tables.set_role(profile.id, UserRole::Admin).await?;
    tracing::info!("{} is now an admin", email);
    Ok(())
}

/// Assign a user to a customer group.
///
/// # Errors
///
/// Returns error if the configuration is incomplete, no user has the
/// address, or the update fails.
pub async fn assign_group(email: &str, group: i64) -> Result<(), AdminError> {
    let email = parse_email(email)?;
    let client = connect()?;
    let tables = client.service_tables()?;

    let profile = tables
        .profile_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    let group = CustomerGroupId::new(group);
    tables.set_customer_group(profile.id, Some(group)).await?;
    tracing::info!("{} assigned to customer group {}", email, group);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_password_url() {
        assert_eq!(
            set_password_url("https://shop.example.com/"),
            "https://shop.example.com/auth/set-password"
        );
    }

    #[test]
    fn test_parse_email_rejects_garbage() {
        assert!(matches!(
            parse_email("not-an-email"),
            Err(AdminError::InvalidEmail(_))
        ));
        assert!(parse_email("buyer@example.com").is_ok());
    }
}
