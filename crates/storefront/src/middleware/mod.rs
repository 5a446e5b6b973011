//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, HTTP transaction)
//! 2. Security headers (CSP, frame and referrer policies)
//! 3. `TraceLayer` (request span with an empty request ID field)
//! 4. Request ID (fill the span field, echo the header)
//! 5. Session layer (tower-sessions, bounded `moka` store)
//! 6. Auth guard (page and API routes only)
//! 7. Rate limiting (login form and JSON API)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, OptionalUser, RequireAdmin, RequireUser, auth_guard, clear_current_user,
    set_current_user,
};
pub use rate_limit::{ClientIpKeyExtractor, api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::{SecurityHeaders, security_headers_middleware};
pub use session::{SessionCache, create_session_layer};
