//! Authentication route handlers.
//!
//! Sign-in, sign-out and setting a password from an invitation or recovery
//! link. Credentials and tokens are handled by the backend's auth API; the
//! session only carries the tokens it issues.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;
use wholesale_core::Email;

use crate::error::clear_sentry_user;
use crate::filters;
use crate::middleware::{OptionalUser, set_current_user};
use crate::models::CurrentUser;
use crate::routes::layout::PageContext;
use crate::state::AppState;
use crate::supabase::{AuthSession, OtpType, SupabaseError};

/// Shortest password accepted when setting a password.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

/// Query parameters carried by invitation and recovery links.
#[derive(Debug, Deserialize)]
pub struct SetPasswordQuery {
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub otp_type: Option<String>,
}

/// Set password form data.
#[derive(Deserialize)]
pub struct SetPasswordForm {
    pub token_hash: String,
    #[serde(rename = "type")]
    pub otp_type: String,
    pub password: SecretString,
    pub password_confirm: SecretString,
}

// =============================================================================
// Templates
// =============================================================================

/// Set password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/set_password.html")]
pub struct SetPasswordTemplate {
    pub page: PageContext,
    pub token_hash: String,
    pub otp_type: String,
    /// Message id of the error.
    pub error: Option<&'static str>,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Start a fresh session for a newly authenticated user.
///
/// The session id is cycled so a pre-login session id cannot be reused.
async fn start_session(session: &Session, auth: &AuthSession) -> Result<(), &'static str> {
    let Some(user) = CurrentUser::from_auth_session(auth) else {
        tracing::warn!(user_id = %auth.user.id, "Auth user has no usable email");
        return Err("unavailable");
    };

    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return Err("session");
    }
    if let Err(e) = set_current_user(session, &user).await {
        tracing::error!(error = %e, "Failed to set session");
        return Err("session");
    }

    tracing::info!(user_id = %user.id, "User signed in");
    Ok(())
}

/// Redirect to the sign-in page with an error code.
fn to_login(error: &str) -> Response {
    Redirect::to(&format!("/?error={error}")).into_response()
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return to_login("credentials");
    };

    match state
        .supabase()
        .sign_in_with_password(&email, &form.password)
        .await
    {
        Ok(auth) => match start_session(&session, &auth).await {
            Ok(()) => Redirect::to("/products").into_response(),
            Err(code) => to_login(code),
        },
        Err(SupabaseError::InvalidCredentials) => {
            tracing::info!("Login rejected");
            to_login("credentials")
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            to_login("unavailable")
        }
    }
}

/// Handle logout. Backend sign-out is best effort; the session is always
/// cleared.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalUser(user): OptionalUser,
) -> Response {
    if let Some(user) = user
        && let Err(e) = state.supabase().sign_out(&user.user.access_token).await
    {
        tracing::warn!(error = %e, "Backend sign-out failed");
    }

    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to clear session");
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

// =============================================================================
// Set Password
// =============================================================================

/// Display the set password form. Links without a token go to the home page.
pub async fn set_password_page(
    page: PageContext,
    Query(query): Query<SetPasswordQuery>,
) -> Response {
    let (Some(token_hash), Some(otp_type)) = (query.token_hash, query.otp_type) else {
        return Redirect::to("/").into_response();
    };
    if token_hash.trim().is_empty() || otp_type.parse::<OtpType>().is_err() {
        return Redirect::to("/").into_response();
    }

    SetPasswordTemplate {
        page,
        token_hash,
        otp_type,
        error: None,
    }
    .into_response()
}

/// Check a new password pair.
fn validate_new_password(password: &str, confirm: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("error-password-too-short");
    }
    if password != confirm {
        return Err("error-password-mismatch");
    }
    Ok(())
}

/// Verify the link token, set the password and sign the user in.
#[instrument(skip_all)]
pub async fn set_password(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<SetPasswordForm>,
) -> Response {
    let Ok(otp_type) = form.otp_type.parse::<OtpType>() else {
        return to_login("link");
    };

    let rerender = |page: PageContext, status: StatusCode, error: &'static str| {
        (
            status,
            SetPasswordTemplate {
                page,
                token_hash: form.token_hash.clone(),
                otp_type: form.otp_type.clone(),
                error: Some(error),
            },
        )
            .into_response()
    };

    // Validate before verifying: verification consumes the token.
    if let Err(message) = validate_new_password(
        form.password.expose_secret(),
        form.password_confirm.expose_secret(),
    ) {
        return rerender(page, StatusCode::BAD_REQUEST, message);
    }

    let auth = match state.supabase().verify_otp(&form.token_hash, otp_type).await {
        Ok(auth) => auth,
        Err(e) => {
            tracing::info!(error = %e, "Password link rejected");
            return to_login("link");
        }
    };

    if let Err(e) = state
        .supabase()
        .update_password(&auth.access_token, &form.password)
        .await
    {
        tracing::error!(error = %e, "Failed to set password");
        return rerender(page, StatusCode::BAD_GATEWAY, "error-set-password");
    }

    match start_session(&session, &auth).await {
        Ok(()) => Redirect::to("/products").into_response(),
        Err(code) => to_login(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("long enough", "long enough").is_ok());
        assert_eq!(
            validate_new_password("short", "short"),
            Err("error-password-too-short")
        );
        assert_eq!(
            validate_new_password("long enough", "long enougH"),
            Err("error-password-mismatch")
        );
    }

    #[test]
    fn test_min_length_counts_characters() {
        assert!(validate_new_password("ąčęėįšųū", "ąčęėįšųū").is_ok());
    }
}
