//! Liveness and readiness checks.
//!
//! Requires a running API server (`cargo run -p exprz-api`).

use exprz_integration_tests::api_base_url;
use reqwest::{Client, StatusCode};

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = Client::new()
        .get(format!("{}/health", api_base_url()))
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_readiness() {
    let resp = Client::new()
        .get(format!("{}/health/ready", api_base_url()))
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_request_id_is_echoed() {
    let resp = Client::new()
        .get(format!("{}/health", api_base_url()))
        .header("x-request-id", "it-request-1")
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(
        resp.headers().get("x-request-id").expect("x-request-id missing"),
        "it-request-1"
    );
}
