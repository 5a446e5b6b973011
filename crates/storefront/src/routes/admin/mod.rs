//! Back-office route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin); the
//! auth guard has already sent non-admins to the catalog. Writes run with the
//! admin's own access token so the backend's row-level security applies.
//!
//! Write failures re-render the page with the error and a 4xx/5xx status;
//! successful writes redirect back to the list with a `?notice=` code.
//! Feedback carries message ids from the interface catalogs, rendered in the
//! visitor's language.

pub mod categories;
pub mod customer_groups;
pub mod products;
pub mod translations;
pub mod users;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;

use crate::state::AppState;

/// Largest accepted product form (including the image).
const PRODUCT_FORM_LIMIT: usize = 10 * 1024 * 1024;

/// Query parameters for notice display.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

impl NoticeQuery {
    /// Message id for the notice code. Unknown codes show nothing.
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        match self.notice.as_deref()? {
            "added" => Some("notice-added"),
            "deleted" => Some("notice-deleted"),
            "saved" => Some("notice-saved"),
            "invited" => Some("notice-invited"),
            _ => None,
        }
    }
}

/// Feedback shown above an admin page.
#[derive(Debug, Clone, Default)]
pub struct Feedback {
    pub success: Option<&'static str>,
    pub error: Option<&'static str>,
    /// Backend text shown after the error, untranslated.
    pub detail: Option<String>,
}

impl Feedback {
    /// Feedback from a `?notice=` query.
    #[must_use]
    pub fn from_query(query: &NoticeQuery) -> Self {
        Self {
            success: query.message(),
            ..Self::default()
        }
    }

    /// An error message.
    #[must_use]
    pub fn error(message: &'static str) -> Self {
        Self {
            error: Some(message),
            ..Self::default()
        }
    }

    /// An error message followed by the backend's explanation.
    #[must_use]
    pub fn rejected(message: &'static str, detail: impl Into<String>) -> Self {
        Self {
            error: Some(message),
            detail: Some(detail.into()),
            ..Self::default()
        }
    }
}

/// Redirect after a successful write.
fn done(path: &str, notice: &str) -> Response {
    Redirect::to(&format!("{path}?notice={notice}")).into_response()
}

/// Give a rendered page an error status.
fn with_status(status: StatusCode, page: impl IntoResponse) -> Response {
    (status, page).into_response()
}

/// Trimmed form value, `None` when blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Create the back-office router (nested under `/admin`).
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/admin/products") }))
        .route(
            "/categories",
            get(categories::index).post(categories::create),
        )
        .route("/categories/delete", post(categories::delete))
        .route(
            "/categories/translations",
            post(categories::save_translation),
        )
        .route(
            "/products",
            get(products::index)
                .post(products::create)
                .layer(DefaultBodyLimit::max(PRODUCT_FORM_LIMIT)),
        )
        .route("/products/delete", post(products::delete))
        .route("/products/prices", post(products::save_price))
        .route(
            "/products/translations",
            get(translations::index).post(translations::save),
        )
        .route(
            "/customer_groups",
            get(customer_groups::index).post(customer_groups::create),
        )
        .route("/users", get(users::index))
        .route("/users/invite", post(users::invite))
        .route("/users/group", post(users::assign_group))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_messages() {
        let query = NoticeQuery {
            notice: Some("added".to_string()),
        };
        assert_eq!(query.message(), Some("notice-added"));
        assert!(NoticeQuery::default().message().is_none());
        assert!(
            NoticeQuery {
                notice: Some("<b>".to_string())
            }
            .message()
            .is_none()
        );
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Seeding ")), Some("Seeding"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
