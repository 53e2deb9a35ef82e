//! Cart management and cash-on-delivery checkout.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p exprz-api)
//! - An SMTP sink the server can deliver OTP and order mail to

use exprz_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::{Value, json};

fn shipping_address() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "streetAddress": "1 Analytical Row",
        "city": "London",
        "county": "Greater London",
        "postcode": "N1 9GU",
        "phone": "07700900123",
        "email": "ada@exprz.test",
    })
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_cart_merges_same_line() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let user = ctx.signup().await;
    let product = ctx.create_product(&admin, "4.00").await;

    for quantity in [1, 2] {
        let resp = ctx
            .client
            .post(ctx.url("/api/cart"))
            .bearer_auth(&user.token)
            .json(&json!({
                "product_id": product["id"],
                "flavour": "Mango",
                "quantity": quantity,
            }))
            .send()
            .await
            .expect("Failed to add to cart");
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/cart/{}", user.id)))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let lines: Value = resp.json().await.expect("Invalid JSON");
    let lines = lines.as_array().expect("array expected");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["product"]["name"], product["name"]);
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_cart_of_another_user_is_forbidden() {
    let ctx = TestContext::new().await;
    let owner = ctx.signup().await;
    let other = ctx.signup().await;

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/cart/{}", owner.id)))
        .bearer_auth(&other.token)
        .send()
        .await
        .expect("Failed to get cart");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_cod_checkout() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let user = ctx.signup().await;
    let product = ctx.create_product(&admin, "10.00").await;

    let resp = ctx
        .client
        .post(ctx.url("/api/cart"))
        .bearer_auth(&user.token)
        .json(&json!({ "product_id": product["id"], "quantity": 2 }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Client totals are ignored; prices come from the catalog.
    let resp = ctx
        .client
        .post(ctx.url("/api/orders/cod"))
        .bearer_auth(&user.token)
        .json(&json!({
            "items": [{ "productId": product["id"], "quantity": 2, "flavour": "Mint" }],
            "shippingAddress": shipping_address(),
            "total": "0.01",
        }))
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("Invalid JSON");
    let order = &body["order"];
    let order_id = order["orderId"].as_str().expect("orderId missing");
    assert_eq!(order["subtotal"], "20.00");
    assert_eq!(order["paymentMethod"], "cod");
    assert_eq!(order["items"][0]["productName"], product["name"]);

    // Cart is cleared in the same transaction
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/cart/{}", user.id)))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to get cart");
    let lines: Value = resp.json().await.expect("Invalid JSON");
    assert!(lines.as_array().expect("array expected").is_empty());

    // Owner can read the order, another customer cannot
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/orders/{order_id}")))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to get order");
    assert_eq!(resp.status(), StatusCode::OK);

    let stranger = ctx.signup().await;
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/orders/{order_id}")))
        .bearer_auth(&stranger.token)
        .send()
        .await
        .expect("Failed to get order");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_order_with_unknown_product() {
    let ctx = TestContext::new().await;
    let user = ctx.signup().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders/cod"))
        .bearer_auth(&user.token)
        .json(&json!({
            "items": [{ "productId": 2_000_000_000, "quantity": 1 }],
            "shippingAddress": shipping_address(),
        }))
        .send()
        .await
        .expect("Failed to place order");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Product 2000000000 is not available");
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_cart_merge_past_integer_range_is_rejected() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let user = ctx.signup().await;
    let product = ctx.create_product(&admin, "1.00").await;

    let add = |quantity: i64| {
        ctx.client
            .post(ctx.url("/api/cart"))
            .bearer_auth(&user.token)
            .json(&json!({ "product_id": product["id"], "quantity": quantity }))
            .send()
    };

    let resp = add(2_147_483_647).await.expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = add(1).await.expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Valid quantity is required");
}
