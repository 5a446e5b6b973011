//! Integration tests for the wholesale storefront.
//!
//! Each test spawns the full router on a random port, with the backend and
//! the email API replaced by `wiremock` servers.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p wholesale-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `auth_guard` - Routing rules for anonymous, customer and admin sessions
//! - `order_confirmation` - Server-side pricing and email delivery
//! - `catalog` - Localized categories and group prices
//! - `admin` - Back-office validation and writes

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wholesale_core::LanguageCode;
use wholesale_storefront::app;
use wholesale_storefront::config::{
    CatalogConfig, DEFAULT_EMAIL_FROM, EmailConfig, I18nConfig, LogFormat, StorefrontConfig,
    SupabaseConfig,
};
use wholesale_storefront::state::AppState;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// User id returned by the mocked auth API.
pub const TEST_USER_ID: &str = "0b5b3a7e-6c1d-4c7b-9f0e-3d2a1b4c5d6e";

/// Email of the signed-in test user.
pub const TEST_EMAIL: &str = "buyer@example.com";

/// A running storefront with mocked dependencies.
pub struct TestApp {
    pub address: String,
    pub supabase: MockServer,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
}

fn test_config(supabase: &MockServer, email: &MockServer) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        supabase: SupabaseConfig {
            url: Url::parse(&supabase.uri()).expect("mock server uri"),
            anon_key: SecretString::from("anon-key-for-integration-tests"),
            service_role_key: Some(SecretString::from("service-key-for-integration-tests")),
        },
        email: EmailConfig {
            api_url: Url::parse(&email.uri()).expect("mock server uri"),
            api_key: SecretString::from("email-key-for-integration-tests"),
            from: DEFAULT_EMAIL_FROM.to_string(),
        },
        catalog: CatalogConfig::default(),
        i18n: I18nConfig {
            default_language: LanguageCode::parse("en").expect("valid code"),
            supported_languages: vec![
                LanguageCode::parse("en").expect("valid code"),
                LanguageCode::parse("lt").expect("valid code"),
            ],
        },
        trust_proxy_headers: false,
        log_format: LogFormat::Text,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

impl TestApp {
    /// Start the storefront against fresh mock servers.
    pub async fn spawn() -> Self {
        let supabase = MockServer::start().await;
        let email_server = MockServer::start().await;

        let state = AppState::new(test_config(&supabase, &email_server))
            .expect("Failed to build application state");
        let router = app::router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().expect("local address").port();

        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        let api_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .cookie_store(true)
            .build()
            .expect("Failed to build client");

        Self {
            address: format!("http://127.0.0.1:{port}"),
            supabase,
            email_server,
            api_client,
        }
    }

    /// GET a path.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// GET a path with an `Accept-Language` header.
    pub async fn get_with_language(&self, path: &str, accept_language: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{}", self.address, path))
            .header("Accept-Language", accept_language)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// POST a URL-encoded form.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.api_client
            .post(format!("{}{}", self.address, path))
            .form(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// POST a JSON body.
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.api_client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// POST a multipart form.
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}{}", self.address, path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Sign in as the test user with the given backend role.
    ///
    /// Mounts the auth mocks the guard needs on every later request.
    pub async fn login(&self, role: &str) {
        let user = json!({ "id": TEST_USER_ID, "email": TEST_EMAIL });

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "access-token",
                "refresh_token": "refresh-token",
                "expires_in": 3600,
                "token_type": "bearer",
                "user": user,
            })))
            .mount(&self.supabase)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .mount(&self.supabase)
            .await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/get_user_role"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(role)))
            .mount(&self.supabase)
            .await;

        let response = self
            .post_form(
                "/auth/login",
                &[("email", TEST_EMAIL), ("password", "correct horse battery")],
            )
            .await;
        assert_eq!(response.status().as_u16(), 303);
        assert_eq!(location(&response), "/products");
    }

    /// Answer GET requests for a table with fixed rows.
    pub async fn mock_table(&self, table: &str, rows: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{table}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.supabase)
            .await;
    }

    /// The signed-in user's profile, with an optional customer group.
    pub async fn mock_profile(&self, group: Option<i64>) {
        self.mock_table(
            "profiles",
            json!([{ "id": TEST_USER_ID, "email": TEST_EMAIL, "customer_group": group }]),
        )
        .await;
    }

    /// Accept every email, expecting exactly `count` sends.
    pub async fn mock_email_accepted(&self, count: u64) {
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "msg_1" })))
            .expect(count)
            .mount(&self.email_server)
            .await;
    }

    /// How many backend requests hit `path`.
    pub async fn backend_hits(&self, path: &str) -> usize {
        self.supabase
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == path)
            .count()
    }

    /// Bodies of the emails the storefront sent.
    pub async fn sent_emails(&self) -> Vec<Value> {
        self.email_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).expect("JSON email body"))
            .collect()
    }
}

/// The `Location` header of a redirect.
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
