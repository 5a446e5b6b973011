//! Security headers middleware.
//!
//! Pages are rendered on the server with no inline scripts, so the policy
//! allows same-origin assets only, plus product images from the backend's
//! storage host.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

/// Policy used when the storage origin cannot be expressed in a header.
const FALLBACK_POLICY: &str = "default-src 'none'; script-src 'self'; style-src 'self'; \
     img-src 'self' data:; form-action 'self'; base-uri 'self'; frame-ancestors 'none'";

/// Signed-in pages show customer prices and must not be stored.
const PAGE_CACHE: &str = "no-store, max-age=0";

/// Stylesheets and other files under `/static`.
const ASSET_CACHE: &str = "public, max-age=86400";

/// Header values shared by every response.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    content_security_policy: HeaderValue,
}

impl SecurityHeaders {
    /// Build the headers for a backend at `backend_url`.
    #[must_use]
    pub fn new(backend_url: &Url) -> Self {
        let policy = content_security_policy(&backend_url.origin().ascii_serialization());
        Self {
            content_security_policy: HeaderValue::from_str(&policy)
                .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_POLICY)),
        }
    }
}

/// The `Content-Security-Policy` for a storage origin.
#[must_use]
pub fn content_security_policy(storage_origin: &str) -> String {
    format!(
        "default-src 'none'; \
         script-src 'self'; \
         style-src 'self'; \
         img-src 'self' {storage_origin} data:; \
         connect-src 'self'; \
         form-action 'self'; \
         base-uri 'self'; \
         object-src 'none'; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: same-origin` (language links redirect back via `next`)
/// - `Content-Security-Policy` from [`SecurityHeaders`]
/// - `Permissions-Policy` denying camera, microphone, geolocation and payment
/// - `Cache-Control`: `no-store` for pages, a day for `/static`
pub async fn security_headers_middleware(
    State(security): State<SecurityHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let is_asset = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));
    headers.insert(CONTENT_SECURITY_POLICY, security.content_security_policy);
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), microphone=(), geolocation=(), payment=()"),
    );
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static(if is_asset { ASSET_CACHE } else { PAGE_CACHE }),
    );

    response
}
