//! Authentication guard and extractors.
//!
//! The guard runs on every page and API route. It validates the session's
//! access token with the backend (refreshing it once when expired), looks up
//! the user's role and applies the routing rules:
//!
//! 1. No session, path neither `/` nor under `/auth` → `303 /`
//!    (`401` for paths under `/api`)
//! 2. Session, role not admin, path under `/admin` → `303 /products`
//! 3. Session, path `/` → `303 /products`
//!
//! The validated identity is stored in request extensions for the
//! [`RequireUser`], [`RequireAdmin`] and [`OptionalUser`] extractors.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use wholesale_core::UserRole;

use crate::error::set_sentry_user;
use crate::models::{AuthenticatedUser, CurrentUser, keys};
use crate::state::AppState;

/// Where anonymous visitors are sent.
pub const LOGIN_PATH: &str = "/";

/// Where signed-in users land.
pub const HOME_PATH: &str = "/products";

/// Outcome of the routing rules for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
    Unauthorized,
}

/// Whether `path` is `prefix` itself or a path below it.
fn is_under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Apply the routing rules. `role` is `None` without a valid session.
#[must_use]
pub fn guard_decision(path: &str, role: Option<UserRole>) -> GuardDecision {
    match role {
        None if path == LOGIN_PATH || is_under(path, "/auth") => GuardDecision::Allow,
        None if is_under(path, "/api") => GuardDecision::Unauthorized,
        None => GuardDecision::Redirect(LOGIN_PATH),
        Some(role) if !role.is_admin() && is_under(path, "/admin") => {
            GuardDecision::Redirect(HOME_PATH)
        }
        Some(_) if path == LOGIN_PATH => GuardDecision::Redirect(HOME_PATH),
        Some(_) => GuardDecision::Allow,
    }
}

/// Request middleware enforcing the routing rules.
pub async fn auth_guard(
    State(state): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let authenticated = load_user(&state, &session).await;
    let path = request.uri().path();

    match guard_decision(path, authenticated.as_ref().map(|user| user.role)) {
        GuardDecision::Allow => {}
        GuardDecision::Redirect(to) => {
            tracing::debug!(path, to, "Auth guard redirect");
            return Redirect::to(to).into_response();
        }
        GuardDecision::Unauthorized => return AuthRejection::Unauthorized.into_response(),
    }

    if let Some(user) = authenticated {
        set_sentry_user(&user.user.id, Some(user.user.email.as_str()));
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

/// Validate the session identity against the backend.
///
/// Returns `None` for anonymous sessions and for sessions whose tokens can
/// no longer be refreshed (those are cleared).
async fn load_user(state: &AppState, session: &Session) -> Option<AuthenticatedUser> {
    let mut user: CurrentUser = match session.get(keys::CURRENT_USER).await {
        Ok(user) => user?,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read session");
            return None;
        }
    };

    let supabase = state.supabase();
    match supabase.get_user(&user.access_token).await {
        Ok(auth_user) if auth_user.id == user.id => {}
        Ok(auth_user) => {
            tracing::warn!(
                session_user = %user.id,
                token_user = %auth_user.id,
                "Session token belongs to another user"
            );
            clear_current_user(session).await;
            return None;
        }
        Err(e) if e.is_unauthorized() => match supabase.refresh_session(&user.refresh_token).await {
            Ok(refreshed) => {
                user.update_tokens(&refreshed);
                if let Err(e) = session.insert(keys::CURRENT_USER, &user).await {
                    tracing::warn!(error = %e, "Failed to store refreshed tokens");
                }
                tracing::debug!(user_id = %user.id, "Access token refreshed");
            }
            Err(e) => {
                tracing::info!(user_id = %user.id, error = %e, "Session expired");
                clear_current_user(session).await;
                return None;
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Could not validate session");
            return None;
        }
    }

    let role = match supabase
        .tables(&user.access_token)
        .user_role(user.id)
        .await
    {
        Ok(role) => UserRole::from_backend(role.as_deref()),
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Role lookup failed");
            UserRole::Customer
        }
    };

    Some(AuthenticatedUser { user, role })
}

// =============================================================================
// Extractors
// =============================================================================

/// Error returned when an extractor's requirement is not met.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (for HTML requests).
    RedirectToLogin,
    /// Redirect to the catalog (signed in, but not allowed).
    RedirectHome,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Forbidden response (for API requests).
    Forbidden,
}

impl AuthRejection {
    fn for_path(parts: &Parts, page: Self, api: Self) -> Self {
        if is_under(parts.uri.path(), "/api") {
            api
        } else {
            page
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::RedirectHome => Redirect::to(HOME_PATH).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "Unauthorized" })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "message": "Forbidden" })),
            )
                .into_response(),
        }
    }
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.user.email)
/// }
/// ```
pub struct RequireUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Self)
            .ok_or_else(|| {
                AuthRejection::for_path(
                    parts,
                    AuthRejection::RedirectToLogin,
                    AuthRejection::Unauthorized,
                )
            })
    }
}

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireUser(user) = RequireUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(Self(user))
        } else {
            Err(AuthRejection::for_path(
                parts,
                AuthRejection::RedirectHome,
                AuthRejection::Forbidden,
            ))
        }
    }
}

/// Extractor that optionally gets the signed-in user.
pub struct OptionalUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session, keeping other session data.
pub async fn clear_current_user(session: &Session) {
    if let Err(e) = session.remove::<CurrentUser>(keys::CURRENT_USER).await {
        tracing::warn!(error = %e, "Failed to clear session user");
    }
}
