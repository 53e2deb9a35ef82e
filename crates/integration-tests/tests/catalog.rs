//! Product and category management through the admin API.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p exprz-api)
//! - An SMTP sink the server can deliver OTP mail to

use exprz_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_admin_routes_reject_customers() {
    let ctx = TestContext::new().await;
    let user = ctx.signup().await;

    let resp = ctx
        .client
        .get(ctx.url("/api/admin/products"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to list admin products");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_product_lifecycle() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let product = ctx.create_product(&admin, "7.50").await;
    let id = product["id"].as_i64().expect("id missing");

    assert_eq!(product["price"], "7.50");
    assert_eq!(product["flavors"], json!(["Mango", "Mint"]));

    // Publicly visible while active
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/products/{id}")))
        .send()
        .await
        .expect("Failed to get product");
    assert_eq!(resp.status(), StatusCode::OK);

    // Deactivate
    let resp = ctx
        .client
        .patch(ctx.url(&format!("/api/admin/products/{id}/status")))
        .bearer_auth(&admin.token)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .expect("Failed to set status");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/products/{id}")))
        .send()
        .await
        .expect("Failed to get product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Admins still see it
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/admin/products/{id}")))
        .bearer_auth(&admin.token)
        .send()
        .await
        .expect("Failed to get admin product");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["is_active"], false);

    let resp = ctx
        .client
        .delete(ctx.url(&format!("/api/admin/products/{id}")))
        .bearer_auth(&admin.token)
        .send()
        .await
        .expect("Failed to delete product");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_product_validation_message() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/admin/products"))
        .bearer_auth(&admin.token)
        .json(&json!({ "name": "No brand", "price": "1.00" }))
        .send()
        .await
        .expect("Failed to create product");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Name, brand, and price are required fields");
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_duplicate_category_is_conflict() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let name = format!("IT Category {}", Uuid::new_v4().simple());

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let resp = ctx
            .client
            .post(ctx.url("/api/admin/categories"))
            .bearer_auth(&admin.token)
            .json(&json!({ "name": name, "description": "Integration" }))
            .send()
            .await
            .expect("Failed to create category");
        assert_eq!(resp.status(), expected);
    }

    let resp = ctx
        .client
        .get(ctx.url("/api/categories"))
        .send()
        .await
        .expect("Failed to list categories");
    let body: Value = resp.json().await.expect("Invalid JSON");
    let matches = body
        .as_array()
        .expect("array expected")
        .iter()
        .filter(|c| c["name"] == name.as_str())
        .count();
    assert_eq!(matches, 1);
}
