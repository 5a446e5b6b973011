//! Integration tests for the catalog page: localization and group prices.

#![allow(clippy::unwrap_used)]

use serde_json::json;
use wholesale_integration_tests::TestApp;

async fn catalog_app(group: Option<i64>) -> TestApp {
    let app = TestApp::spawn().await;
    app.login("customer").await;
    app.mock_profile(group).await;
    app.mock_table(
        "languages",
        json!([
            { "id": 1, "name": "English", "code": "en" },
            { "id": 2, "name": "Lietuvių", "code": "lt" }
        ]),
    )
    .await;
    app.mock_table(
        "categories",
        json!([
            { "id": 1, "category_name": "Seeding" },
            { "id": 2, "category_name": "Tillage" }
        ]),
    )
    .await;
    app.mock_table(
        "category_translations",
        json!([{ "category_id": 1, "language_id": 2, "category_name": "Sėja" }]),
    )
    .await;
    app.mock_table(
        "product_translations",
        json!([{ "product_id": 1, "language_id": 2, "part_name": "Sėjamoji" }]),
    )
    .await;
    app.mock_table(
        "products",
        json!([
            { "id": 1, "part_name": "Seed drill", "part_code": "SD-1", "category_id": 1 },
            { "id": 2, "part_name": "Disc harrow", "part_code": "DH-2", "category_id": 2 }
        ]),
    )
    .await;
    app.mock_table(
        "prices",
        json!([{ "id": 10, "product_id": 1, "customer_group_id": 2, "price": "80.00" }]),
    )
    .await;
    app
}

#[tokio::test]
async fn test_translated_names_fall_back_to_defaults() {
    let app = catalog_app(Some(2)).await;

    let response = app.get_with_language("/products", "lt-LT,lt;q=0.9,en;q=0.5").await;
    assert_eq!(response.status().as_u16(), 200);
    let body = response.text().await.unwrap();

    assert!(body.contains("<html lang=\"lt\">"));
    assert!(body.contains("Sėja"));
    assert!(body.contains("Tillage"));
    assert!(!body.contains(">Seeding<"));
    assert!(body.contains("Sėjamoji"));
    assert!(body.contains("Disc harrow"));
}

#[tokio::test]
async fn test_interface_follows_display_language() {
    let app = catalog_app(Some(2)).await;

    let body = app
        .get_with_language("/products", "lt")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Krepšelis"));
    assert!(body.contains("Visos kategorijos"));
    assert!(body.contains("Kaina pagal užklausą"));
    assert!(!body.contains("Price on request"));

    let body = app.get("/products").await.text().await.unwrap();
    assert!(body.contains("All categories"));
    assert!(!body.contains("Krepšelis"));
}

#[tokio::test]
async fn test_default_language_shows_default_names() {
    let app = catalog_app(Some(2)).await;

    let body = app.get("/products").await.text().await.unwrap();

    assert!(body.contains("Seeding"));
    assert!(!body.contains("Sėja"));
}

#[tokio::test]
async fn test_chosen_language_overrides_browser() {
    let app = catalog_app(Some(2)).await;

    let response = app.get("/lang/lt?next=/products").await;
    assert_eq!(response.status().as_u16(), 303);

    let body = app
        .get_with_language("/products", "en")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Sėja"));
    assert!(body.contains("Atsijungti"));
}

#[tokio::test]
async fn test_prices_follow_customer_group() {
    let app = catalog_app(Some(2)).await;

    let body = app.get("/products").await.text().await.unwrap();

    assert!(body.contains("80.00€"));
    assert!(body.contains("Price on request"));
}

#[tokio::test]
async fn test_user_without_group_sees_notice() {
    let app = catalog_app(None).await;

    let body = app.get("/products").await.text().await.unwrap();

    assert!(body.contains("no customer group"));
    assert!(!body.contains("80.00€"));
}

#[tokio::test]
async fn test_huge_page_number_renders_last_page() {
    let app = catalog_app(Some(2)).await;

    let response = app.get("/products?page=200000000").await;

    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("Page 10000"));
}
