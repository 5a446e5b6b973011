//! Home page: the sign-in form.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::Query;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::filters;
use crate::routes::layout::PageContext;

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub error: Option<String>,
}

/// Home (sign-in) page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub error: Option<&'static str>,
}

/// Message id for an `?error=` code. Unknown codes show nothing.
#[must_use]
pub fn error_message(code: Option<&str>) -> Option<&'static str> {
    match code? {
        "credentials" => Some("error-credentials"),
        "unavailable" => Some("error-unavailable"),
        "session" => Some("error-session"),
        "link" => Some("error-link"),
        _ => None,
    }
}

/// Display the sign-in page.
pub async fn home(page: PageContext, Query(query): Query<HomeQuery>) -> impl IntoResponse {
    HomeTemplate {
        page,
        error: error_message(query.error.as_deref()),
    }
}
