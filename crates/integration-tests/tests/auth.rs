//! Signup, login and bearer-token tests.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p exprz-api)
//! - An SMTP sink the server can deliver OTP mail to

use exprz_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_signup_flow_issues_token() {
    let ctx = TestContext::new().await;
    let user = ctx.signup().await;

    let resp = ctx
        .client
        .get(ctx.url("/api/protected"))
        .bearer_auth(&user.token)
        .send()
        .await
        .expect("Failed to call protected route");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert!(
        body["message"]
            .as_str()
            .is_some_and(|m| m.starts_with("Welcome "))
    );

    // The OTP row is consumed on success.
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM otp_codes WHERE email = $1")
        .bind(&user.email)
        .fetch_one(&ctx.pool)
        .await
        .expect("Failed to count OTP rows");
    assert_eq!(remaining, 0);
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_duplicate_signup_is_conflict() {
    let ctx = TestContext::new().await;
    let user = ctx.signup().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/auth/signup-request-otp"))
        .json(&json!({
            "username": "someone_else",
            "email": user.email,
            "password": "Another-Pass-123",
            "phone": "07700900999",
        }))
        .send()
        .await
        .expect("Failed to request OTP");

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "User with this email already exists");
}

#[tokio::test]
#[ignore = "Requires running API server, database and SMTP sink"]
async fn test_login_with_wrong_password() {
    let ctx = TestContext::new().await;
    let user = ctx.signup().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/auth/login"))
        .json(&json!({ "email": user.email, "password": "not-the-password" }))
        .send()
        .await
        .expect("Failed to log in");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_verify_with_unknown_email() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .post(ctx.url("/api/auth/verify-otp"))
        .json(&json!({ "email": "nobody@exprz.test", "otp": "123456" }))
        .send()
        .await
        .expect("Failed to verify OTP");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_protected_requires_token() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .get(ctx.url("/api/protected"))
        .send()
        .await
        .expect("Failed to call protected route");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = ctx
        .client
        .get(ctx.url("/api/protected"))
        .bearer_auth("not.a.jwt")
        .send()
        .await
        .expect("Failed to call protected route");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["error"], "Invalid or expired token");
}
