//! Data shared by every page layout.

use axum::{
    extract::FromRequestParts,
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use tower_sessions::Session;
use wholesale_core::LanguageCode;

use crate::i18n::Messages;
use crate::models::{AuthenticatedUser, CartItem, keys};
use crate::routes::lang::language_from_cookies;
use crate::services::localization::preferred_language;
use crate::state::AppState;

/// A language switcher entry.
#[derive(Debug, Clone)]
pub struct LanguageLink {
    pub code: String,
    pub current: bool,
}

/// Values the base layout renders on every page.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub user_email: Option<String>,
    pub is_admin: bool,
    pub cart_count: u32,
    pub language: LanguageCode,
    pub messages: Messages,
    pub languages: Vec<LanguageLink>,
    /// Current path and query.
    pub path: String,
    /// `path`, percent-encoded for a `next=` parameter.
    pub next: String,
}

impl PageContext {
    /// The display language code, for templates.
    #[must_use]
    pub fn lang(&self) -> &str {
        self.language.as_str()
    }

    /// An interface message in the display language.
    #[must_use]
    pub fn t(&self, id: &str) -> String {
        self.messages.get(id)
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<AuthenticatedUser>();
        let session = parts.extensions.get::<Session>();

        let cart_count = match session {
            Some(session) => {
                let cart: Vec<CartItem> = session
                    .get(keys::CART)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_default();
                cart.iter()
                    .fold(0_u32, |sum, item| sum.saturating_add(item.quantity))
            }
            None => 0,
        };

        let accept_language = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());
        let i18n = &state.config().i18n;
        let stored = language_from_cookies(&parts.headers);
        let language = preferred_language(i18n, stored.as_deref(), accept_language);

        let languages = i18n
            .supported_languages
            .iter()
            .map(|code| LanguageLink {
                code: code.as_str().to_string(),
                current: *code == language,
            })
            .collect();

        let path = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        Ok(Self {
            user_email: user.map(|u| u.user.email.to_string()),
            is_admin: user.is_some_and(AuthenticatedUser::is_admin),
            cart_count,
            messages: Messages::new(&language),
            language,
            languages,
            next: urlencoding::encode(&path).into_owned(),
            path,
        })
    }
}
