//! Integration tests for the routing rules applied by the auth guard.

#![allow(clippy::unwrap_used)]

use serde_json::{Value, json};
use wholesale_integration_tests::{TEST_EMAIL, TEST_USER_ID, TestApp, location};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

// =============================================================================
// Anonymous Visitors
// =============================================================================

#[tokio::test]
async fn test_anonymous_page_request_redirects_to_sign_in() {
    let app = TestApp::spawn().await;

    for path in ["/products", "/cart", "/admin/products", "/admin/users"] {
        let response = app.get(path).await;
        assert_eq!(response.status().as_u16(), 303, "{path}");
        assert_eq!(location(&response), "/", "{path}");
    }
}

#[tokio::test]
async fn test_anonymous_sign_in_page_renders() {
    let app = TestApp::spawn().await;

    let response = app.get("/").await;
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("action=\"/auth/login\""));
}

#[tokio::test]
async fn test_anonymous_api_request_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .post_json(
            "/api/send-order-confirmation",
            &json!({ "email": "buyer@example.com", "cart": [] }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn test_language_switch_is_public_and_stays_on_site() {
    let app = TestApp::spawn().await;

    let response = app.get("/lang/lt?next=/").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");

    let response = app.get("/lang/lt?next=//evil.test").await;
    assert_eq!(location(&response), "/products");

    let response = app.get("/lang/lt?next=/%09/evil.test").await;
    assert_eq!(location(&response), "/products");

    let response = app.get("/lang/lt?next=/cart%0D%0ASet-Cookie:%20a=b").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/products");
}

#[tokio::test]
async fn test_anonymous_language_switch_creates_no_session() {
    let app = TestApp::spawn().await;

    let response = app.get("/lang/lt?next=/").await;
    let cookies: Vec<&str> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();

    assert!(cookies.iter().any(|c| c.starts_with("wholesale_lang=lt")));
    assert!(!cookies.iter().any(|c| c.starts_with("wholesale_session=")));

    let response = app.get("/lang/xx?next=/").await;
    assert!(response.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn test_language_cookie_localizes_sign_in_page() {
    let app = TestApp::spawn().await;
    app.get("/lang/lt?next=/").await;

    let body = app.get("/").await.text().await.unwrap();
    assert!(body.contains("<html lang=\"lt\""));
}

#[tokio::test]
async fn test_set_password_without_token_redirects_home() {
    let app = TestApp::spawn().await;

    let response = app.get("/auth/set-password").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_rejected_credentials_redirect_with_error() {
    let app = TestApp::spawn().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/auth/v1/token"))
        .respond_with(
            wiremock::ResponseTemplate::new(400)
                .set_body_json(json!({ "error": "invalid_grant" })),
        )
        .mount(&app.supabase)
        .await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", "buyer@example.com"), ("password", "wrong password")],
        )
        .await;

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/?error=credentials");
}

// =============================================================================
// Signed-in Users
// =============================================================================

#[tokio::test]
async fn test_signed_in_user_is_sent_from_sign_in_to_catalog() {
    let app = TestApp::spawn().await;
    app.login("customer").await;

    let response = app.get("/").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/products");
}

#[tokio::test]
async fn test_customer_cannot_open_admin_pages() {
    let app = TestApp::spawn().await;
    app.login("customer").await;

    let response = app.get("/admin/categories").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/products");
}

#[tokio::test]
async fn test_admin_can_open_admin_pages() {
    let app = TestApp::spawn().await;
    app.login("admin").await;
    app.mock_table("customer_groups", json!([{ "id": 1, "group_name": "Dealers" }]))
        .await;

    let response = app.get("/admin/customer_groups").await;
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("Dealers"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = TestApp::spawn().await;
    app.login("customer").await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .and(wiremock::matchers::path("/auth/v1/logout"))
        .respond_with(wiremock::ResponseTemplate::new(204))
        .mount(&app.supabase)
        .await;

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");

    let response = app.get("/products").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");
}

// =============================================================================
// Expired Access Tokens
// =============================================================================

fn auth_session(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "expires_in": 3600,
        "token_type": "bearer",
        "user": { "id": TEST_USER_ID, "email": TEST_EMAIL },
    })
}

/// Sign in with an access token the backend already considers expired.
async fn login_with_stale_token(app: &TestApp) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_session("stale-token", "refresh-1")),
        )
        .mount(&app.supabase)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "msg": "JWT expired" })),
        )
        .mount(&app.supabase)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/get_user_role"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("customer")))
        .mount(&app.supabase)
        .await;

    let response = app
        .post_form(
            "/auth/login",
            &[("email", TEST_EMAIL), ("password", "correct horse battery")],
        )
        .await;
    assert_eq!(location(&response), "/products");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once_and_kept() {
    let app = TestApp::spawn().await;
    login_with_stale_token(&app).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "refresh-1" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(auth_session("fresh-token", "refresh-2")),
        )
        .expect(1)
        .mount(&app.supabase)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": TEST_USER_ID, "email": TEST_EMAIL })),
        )
        .expect(1)
        .mount(&app.supabase)
        .await;

    // The refreshed tokens are stored, so the second request validates the
    // new access token instead of refreshing again.
    for _ in 0..2 {
        let response = app.get("/cart").await;
        assert_eq!(response.status().as_u16(), 200);
    }
}

#[tokio::test]
async fn test_failed_refresh_clears_the_session() {
    let app = TestApp::spawn().await;
    login_with_stale_token(&app).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used",
        })))
        .expect(1)
        .mount(&app.supabase)
        .await;

    let response = app.get("/cart").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");

    // The session is gone: no second refresh attempt.
    let response = app.get("/cart").await;
    assert_eq!(location(&response), "/");
}

// =============================================================================
// Unguarded Routes
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_backend() {
    let app = TestApp::spawn().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .and(wiremock::matchers::path("/rest/v1/"))
        .respond_with(wiremock::ResponseTemplate::new(503))
        .mount(&app.supabase)
        .await;

    let response = app.get("/health/ready").await;
    assert_eq!(response.status().as_u16(), 503);
}
