//! Session-related types.
//!
//! Types stored in the session for authentication state, the preferred
//! language and the cart.

use serde::{Deserialize, Serialize};

use wholesale_core::{Email, ProductId, UserId, UserRole};

use crate::supabase::AuthSession;

/// Session-stored user identity and backend tokens.
///
/// The tokens are the backend's own; the server never issues tokens itself.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth user id.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Backend access token (JWT) used for row-level security.
    pub access_token: String,
    /// Backend refresh token.
    pub refresh_token: String,
    /// Unix timestamp at which `access_token` expires.
    pub expires_at: i64,
}

impl CurrentUser {
    /// Build the session identity from a freshly issued backend session.
    ///
    /// Returns `None` when the auth user has no usable email address.
    #[must_use]
    pub fn from_auth_session(session: &AuthSession) -> Option<Self> {
        let email = Email::parse(session.user.email.as_deref()?).ok()?;
        Some(Self {
            id: session.user.id,
            email,
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at(),
        })
    }

    /// Replace the tokens after a refresh.
    pub fn update_tokens(&mut self, session: &AuthSession) {
        self.access_token.clone_from(&session.access_token);
        self.refresh_token.clone_from(&session.refresh_token);
        self.expires_at = session.expires_at();
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A validated user with their role, placed in request extensions by the
/// auth guard.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: CurrentUser,
    pub role: UserRole,
}

impl AuthenticatedUser {
    /// Whether the user may use the back-office.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// One cart line. Prices are never stored; they are computed on render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the cart lines.
    pub const CART: &str = "cart";
}
