//! Integration tests for the order confirmation API.
//!
//! Prices always come from the signed-in user's customer group; the client's
//! prices are ignored.

#![allow(clippy::unwrap_used)]

use serde_json::{Value, json};
use wholesale_integration_tests::{TEST_EMAIL, TestApp};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

const ENDPOINT: &str = "/api/send-order-confirmation";

/// A signed-in customer in group 2, with one product priced at 80.00.
async fn customer_with_catalog() -> TestApp {
    let app = TestApp::spawn().await;
    app.login("customer").await;
    app.mock_profile(Some(2)).await;
    app.mock_table(
        "products",
        json!([{
            "id": 1,
            "part_name": "Seed drill",
            "part_code": "SD-1",
            "group_name": "Drills",
            "image": null,
            "category_id": null
        }]),
    )
    .await;
    app.mock_table(
        "prices",
        json!([{ "id": 10, "product_id": 1, "customer_group_id": 2, "price": "80.00" }]),
    )
    .await;
    app
}

async fn message(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["message"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_confirmation_uses_server_prices() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(1).await;

    let response = app
        .post_json(
            ENDPOINT,
            &json!({
                "email": "orders@farm.example",
                "cart": [{ "id": 1, "quantity": 2, "price": 1.0, "part_name": "Seed drill" }]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(message(response).await, "Email sent successfully");

    let emails = app.sent_emails().await;
    assert_eq!(emails.len(), 1);
    let email = &emails[0];
    assert_eq!(email["to"], json!(["orders@farm.example"]));
    assert_eq!(email["subject"], "Order Confirmation");

    let html = email["html"].as_str().unwrap();
    assert!(html.contains("Seed drill (x2) - 80.00€ each"));
    assert!(html.contains("Total Amount: 160.00€"));
    assert!(!html.contains("1.00€"));
}

#[tokio::test]
async fn test_duplicate_lines_are_merged() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(1).await;

    let response = app
        .post_json(
            ENDPOINT,
            &json!({
                "email": TEST_EMAIL,
                "cart": [
                    { "product_id": 1, "quantity": 1 },
                    { "product_id": 1, "quantity": 3 }
                ]
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let html = app.sent_emails().await[0]["html"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(html.contains("Seed drill (x4) - 80.00€ each"));
    assert!(html.contains("Total Amount: 320.00€"));
}

#[tokio::test]
async fn test_unknown_product_is_rejected_without_email() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(0).await;

    let response = app
        .post_json(
            ENDPOINT,
            &json!({ "email": TEST_EMAIL, "cart": [{ "id": 99, "quantity": 1 }] }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    assert!(app.sent_emails().await.is_empty());
}

#[tokio::test]
async fn test_invalid_quantity_is_rejected() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(0).await;

    for quantity in [0, -3, 10_001] {
        let response = app
            .post_json(
                ENDPOINT,
                &json!({ "email": TEST_EMAIL, "cart": [{ "id": 1, "quantity": quantity }] }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 400, "quantity {quantity}");
    }
}

#[tokio::test]
async fn test_oversized_cart_is_rejected_before_lookups() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(0).await;

    let cart: Vec<Value> = (1..=201).map(|id| json!({ "id": id, "quantity": 1 })).collect();
    let response = app
        .post_json(ENDPOINT, &json!({ "email": TEST_EMAIL, "cart": cart }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
    assert!(message(response).await.contains("200"));
    assert_eq!(app.backend_hits("/rest/v1/products").await, 0);
    assert_eq!(app.backend_hits("/rest/v1/prices").await, 0);
    assert_eq!(app.backend_hits("/rest/v1/profiles").await, 0);
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(0).await;

    let response = app
        .post_json(ENDPOINT, &json!({ "email": TEST_EMAIL, "cart": [] }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_invalid_body_and_email_are_rejected() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(0).await;

    let response = app.post_json(ENDPOINT, &json!({ "cart": "nope" })).await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(message(response).await, "Invalid request body");

    let response = app
        .post_json(
            ENDPOINT,
            &json!({ "email": "not an email", "cart": [{ "id": 1, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(message(response).await, "Invalid email address");
}

#[tokio::test]
async fn test_user_without_customer_group_is_rejected() {
    let app = TestApp::spawn().await;
    app.login("customer").await;
    app.mock_profile(None).await;
    app.mock_email_accepted(0).await;

    let response = app
        .post_json(
            ENDPOINT,
            &json!({ "email": TEST_EMAIL, "cart": [{ "id": 1, "quantity": 1 }] }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_email_failure_is_reported() {
    let app = customer_with_catalog().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_json(
            ENDPOINT,
            &json!({ "email": TEST_EMAIL, "cart": [{ "id": 1, "quantity": 1 }] }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(message(response).await, "Failed to send email");
}

#[tokio::test]
async fn test_cart_checkout_emails_the_signed_in_user() {
    let app = customer_with_catalog().await;
    app.mock_email_accepted(1).await;

    let response = app
        .post_form("/cart/add", &[("product_id", "1"), ("quantity", "3")])
        .await;
    assert_eq!(response.status().as_u16(), 303);

    let response = app.post_form("/cart/checkout", &[]).await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(
        wholesale_integration_tests::location(&response),
        "/cart?status=sent"
    );

    let emails = app.sent_emails().await;
    assert_eq!(emails[0]["to"], json!([TEST_EMAIL]));
    let html = emails[0]["html"].as_str().unwrap();
    assert!(html.contains("Total Amount: 240.00€"));
}
