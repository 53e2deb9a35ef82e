//! Order email retry sweep.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p exprz-api)
//! - An SMTP sink the server can deliver OTP and order mail to
//! - The server's environment (`.env`), since the sweep runs in-process

use exprz_api::config::ApiConfig;
use exprz_api::services::notifications::retry_failed;
use exprz_api::state::AppState;
use exprz_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::{Value, json};

async fn place_order(ctx: &TestContext) -> String {
    let admin = ctx.admin().await;
    let user = ctx.signup().await;
    let product = ctx.create_product(&admin, "7.50").await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders/cod"))
        .bearer_auth(&user.token)
        .json(&json!({
            "items": [{ "productId": product["id"], "quantity": 1 }],
            "shippingAddress": {
                "firstName": "Grace",
                "lastName": "Hopper",
                "streetAddress": "2 Compiler Lane",
                "city": "Leeds",
                "postcode": "LS1 4AP",
                "phone": "07700900456",
                "email": "grace@exprz.test",
            },
        }))
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("Invalid JSON");
    body["order"]["orderId"]
        .as_str()
        .expect("orderId missing")
        .to_string()
}

async fn sweep(ctx: &TestContext) -> usize {
    let config = ApiConfig::from_env().expect("Server environment must be loadable");
    let state = AppState::new(config, ctx.pool.clone()).expect("Failed to build state");
    retry_failed(&state).await.expect("Sweep failed").attempted
}

async fn delivery_row(ctx: &TestContext, order_number: &str) -> (bool, bool, bool, Option<String>) {
    sqlx::query_as(
        "SELECT email_sent, customer_email_sent, admin_email_sent, email_error
         FROM order_details WHERE order_number = $1",
    )
    .bind(order_number)
    .fetch_one(&ctx.pool)
    .await
    .expect("order_details row missing")
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_sweep_delivers_order_whose_dispatch_never_ran() {
    let ctx = TestContext::new().await;
    let order_number = place_order(&ctx).await;

    // State left behind when the server dies before its dispatch task runs.
    sqlx::query(
        "UPDATE order_details
         SET email_sent = FALSE, customer_email_sent = FALSE, admin_email_sent = FALSE,
             email_error = 'pending', updated_at = NOW() - INTERVAL '1 day'
         WHERE order_number = $1",
    )
    .bind(&order_number)
    .execute(&ctx.pool)
    .await
    .expect("Failed to reset delivery state");

    assert!(sweep(&ctx).await >= 1);

    let (sent, customer, admin, error) = delivery_row(&ctx, &order_number).await;
    assert!(customer, "customer email not delivered");
    assert!(admin, "admin email not delivered");
    assert!(sent);
    assert_eq!(error, None);
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_sweep_only_resends_outstanding_recipient() {
    let ctx = TestContext::new().await;
    let order_number = place_order(&ctx).await;

    sqlx::query(
        "UPDATE order_details
         SET email_sent = FALSE, customer_email_sent = TRUE, admin_email_sent = FALSE,
             email_error = 'admin: connection refused', updated_at = NOW() - INTERVAL '1 day'
         WHERE order_number = $1",
    )
    .bind(&order_number)
    .execute(&ctx.pool)
    .await
    .expect("Failed to reset delivery state");

    sweep(&ctx).await;

    let (sent, customer, admin, error) = delivery_row(&ctx, &order_number).await;
    assert!(customer);
    assert!(admin);
    assert!(sent);
    assert_eq!(error, None);
}
