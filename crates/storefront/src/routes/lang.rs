//! Language switcher.
//!
//! The choice lives in its own cookie rather than the session, so anonymous
//! visitors can switch language without the server keeping any state.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, header::COOKIE, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};
use wholesale_core::LanguageCode;

use crate::routes::local_path;
use crate::state::AppState;

/// Cookie holding the preferred display language.
pub const LANGUAGE_COOKIE: &str = "wholesale_lang";

/// How long the preference is remembered (one year).
const LANGUAGE_COOKIE_DAYS: i64 = 365;

/// Query parameters for the language switcher.
#[derive(Debug, Deserialize)]
pub struct LangQuery {
    pub next: Option<String>,
}

/// The language stored in the request's cookies, if any.
#[must_use]
pub fn language_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == LANGUAGE_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn language_cookie(language: &LanguageCode, secure: bool) -> String {
    Cookie::build((LANGUAGE_COOKIE, language.as_str().to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(LANGUAGE_COOKIE_DAYS))
        .build()
        .to_string()
}

/// Remember the preferred language when it is supported, then go back.
pub async fn switch(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<LangQuery>,
) -> Response {
    let redirect = Redirect::to(local_path(query.next.as_deref(), "/products"));

    match LanguageCode::parse(&code) {
        Ok(language) if state.config().i18n.supports(&language) => {
            let cookie = language_cookie(&language, state.config().is_secure());
            ([(SET_COOKIE, cookie)], redirect).into_response()
        }
        _ => {
            tracing::debug!(code = %code, "Unsupported language requested");
            redirect.into_response()
        }
    }
}
