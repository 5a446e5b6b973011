//! Router assembly.
//!
//! Shared by the binary and the integration tests so both exercise the same
//! middleware stack.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{
    ClientIpKeyExtractor, SecurityHeaders, auth_guard, create_session_layer,
    request_id_middleware, security_headers_middleware,
};
use crate::routes;
use crate::state::AppState;

/// Build the complete application router.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let security = SecurityHeaders::new(&state.config().supabase.url);

    let client_ip = ClientIpKeyExtractor::new(state.config().trust_proxy_headers);
    let guarded =
        routes::routes(client_ip).layer(from_fn_with_state(state.clone(), auth_guard));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/lang/{code}", get(routes::lang::switch))
        .nest_service(
            "/static",
            ServeDir::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")),
        )
        .merge(guarded)
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn_with_state(security, security_headers_middleware))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.supabase().health().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Backend not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
