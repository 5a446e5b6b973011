//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Sign-in page
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (backend reachable)
//! GET  /lang/{code}            - Switch language (cookie, no session)
//!
//! # Auth
//! POST /auth/login             - Sign in with email and password
//! POST /auth/logout            - Sign out
//! GET  /auth/set-password      - Set password from an invitation link
//! POST /auth/set-password      - Set password action
//!
//! # Catalog and cart (requires auth)
//! GET  /products               - Product listing with group prices
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//! POST /cart/checkout          - Email the order confirmation
//!
//! # API (requires auth, JSON)
//! POST /api/send-order-confirmation - Price a cart and email the confirmation
//!
//! # Admin (requires admin role)
//! GET  /admin/products         - Products and group prices
//! GET  /admin/products/translations - Product name translations
//! GET  /admin/categories       - Categories and their translations
//! GET  /admin/customer_groups  - Customer groups
//! GET  /admin/users            - Users, invitations, group assignment
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod cart;
pub mod home;
pub mod lang;
pub mod layout;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{ClientIpKeyExtractor, api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;
use crate::supabase::SupabaseError;

/// Rows from a list query, or none when it failed.
///
/// Pages render with whatever loaded; failures are logged.
pub(crate) fn or_empty<T>(result: Result<Vec<T>, SupabaseError>, what: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, what, "Failed to load rows");
        Vec::new()
    })
}

/// A same-site path to redirect to, or `fallback`.
///
/// Absolute and protocol-relative URLs are refused, as are control
/// characters: browsers drop tabs and newlines (`/\t/evil.test` becomes
/// `//evil.test`) and they are not valid in a `Location` header.
#[must_use]
pub fn local_path<'a>(next: Option<&'a str>, fallback: &'a str) -> &'a str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => fallback,
    }
}

/// Create the auth routes router.
pub fn auth_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            post(auth::login).layer(auth_rate_limiter(client_ip)),
        )
        .route("/logout", post(auth::logout))
        .route(
            "/set-password",
            get(auth::set_password_page).post(auth::set_password),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/checkout", post(cart::checkout))
}

/// Create the JSON API routes router.
pub fn api_routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new().route(
        "/send-order-confirmation",
        post(api::order_confirmation::send).layer(api_rate_limiter(client_ip)),
    )
}

/// Create all guarded routes for the storefront.
///
/// `client_ip` keys the rate limits on the login form and the JSON API.
pub fn routes(client_ip: ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/products", get(products::index))
        .nest("/auth", auth_routes(client_ip))
        .nest("/cart", cart_routes())
        .nest("/api", api_routes(client_ip))
        .nest("/admin", admin::admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_accepts_site_paths() {
        assert_eq!(
            local_path(Some("/products?page=2"), "/"),
            "/products?page=2"
        );
        assert_eq!(local_path(Some("/cart"), "/products"), "/cart");
    }

    #[test]
    fn test_local_path_refuses_other_sites() {
        assert_eq!(
            local_path(Some("https://evil.test/"), "/products"),
            "/products"
        );
        assert_eq!(local_path(Some("//evil.test/"), "/products"), "/products");
        assert_eq!(local_path(Some("/\\evil.test"), "/products"), "/products");
        assert_eq!(local_path(Some("/\t/evil.test"), "/products"), "/products");
        assert_eq!(local_path(Some(""), "/cart"), "/cart");
        assert_eq!(local_path(None, "/cart"), "/cart");
    }

    #[test]
    fn test_local_path_refuses_control_characters() {
        for next in ["/cart\r\nSet-Cookie: a=b", "/\n/evil.test", "/cart\0", "/cart\u{7f}"] {
            assert_eq!(local_path(Some(next), "/products"), "/products", "{next:?}");
        }
    }
}
