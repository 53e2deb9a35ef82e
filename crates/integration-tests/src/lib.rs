//! Integration tests for the Exprz shop API.
//!
//! These run against a live server and database, so every test is
//! `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Database and an SMTP sink (e.g. Mailpit) must be up
//! exprz-cli migrate
//! cargo run -p exprz-api
//!
//! cargo test -p exprz-integration-tests -- --ignored
//! ```
//!
//! # Environment
//!
//! - `API_BASE_URL` - server under test (default `http://localhost:5000`)
//! - `API_DATABASE_URL` - the server's database; used to read OTP codes
//!   and to promote test admins

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Base URL for the API (configurable via environment).
#[must_use]
pub fn api_base_url() -> String {
    std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Shared handles for one test.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
}

/// A signed-up account and its bearer token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestContext {
    /// Connect to the server's database and build an HTTP client.
    ///
    /// # Panics
    ///
    /// Panics if `API_DATABASE_URL` is unset or unreachable.
    pub async fn new() -> Self {
        let database_url = std::env::var("API_DATABASE_URL")
            .map(SecretString::from)
            .expect("API_DATABASE_URL must be set for integration tests");
        let pool = PgPool::connect(database_url.expose_secret())
            .await
            .expect("Failed to connect to test database");

        Self {
            client: Client::new(),
            base_url: api_base_url(),
            pool,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Run the full signup flow for a fresh, unique account.
    ///
    /// The OTP is read straight from `otp_codes` instead of a mailbox.
    ///
    /// # Panics
    ///
    /// Panics if any step of the flow fails.
    pub async fn signup(&self) -> TestUser {
        let suffix = Uuid::new_v4().simple().to_string();
        let email = format!("it-{}@exprz.test", &suffix[..12]);
        let password = "Sup3r-Secret-Pass".to_string();

        let resp = self
            .client
            .post(self.url("/api/auth/signup-request-otp"))
            .json(&json!({
                "username": format!("it_{}", &suffix[..12]),
                "email": email,
                "password": password,
                "phone": "07700900123",
            }))
            .send()
            .await
            .expect("Failed to request OTP");
        assert_eq!(resp.status(), StatusCode::OK, "signup request failed");

        let otp: String = sqlx::query_scalar("SELECT code FROM otp_codes WHERE email = $1")
            .bind(&email)
            .fetch_one(&self.pool)
            .await
            .expect("OTP row missing");

        let resp = self
            .client
            .post(self.url("/api/auth/verify-otp"))
            .json(&json!({ "email": email, "otp": otp }))
            .send()
            .await
            .expect("Failed to verify OTP");
        assert_eq!(resp.status(), StatusCode::CREATED, "OTP verification failed");

        let body: Value = resp.json().await.expect("Invalid auth response");
        TestUser {
            id: body["id"].as_i64().expect("id missing"),
            email,
            password,
            token: body["token"].as_str().expect("token missing").to_string(),
        }
    }

    /// Sign up a user, grant admin rights, and log in again so the new
    /// token carries the flag.
    ///
    /// # Panics
    ///
    /// Panics if any step fails.
    pub async fn admin(&self) -> TestUser {
        let user = self.signup().await;

        sqlx::query("UPDATE users SET is_admin = TRUE, role = 'admin' WHERE email = $1")
            .bind(&user.email)
            .execute(&self.pool)
            .await
            .expect("Failed to promote test admin");

        let token = self.login(&user.email, &user.password).await;
        TestUser { token, ..user }
    }

    /// Log in and return the bearer token.
    ///
    /// # Panics
    ///
    /// Panics if the login is rejected.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to log in");
        assert_eq!(resp.status(), StatusCode::OK, "login failed");

        let body: Value = resp.json().await.expect("Invalid login response");
        body["token"].as_str().expect("token missing").to_string()
    }

    /// Create an active product through the admin API.
    ///
    /// # Panics
    ///
    /// Panics if creation fails.
    pub async fn create_product(&self, admin: &TestUser, price: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/admin/products"))
            .bearer_auth(&admin.token)
            .json(&json!({
                "name": format!("IT Product {}", Uuid::new_v4().simple()),
                "brand": "Integration",
                "price": price,
                "stock": 25,
                "flavors": ["Mango", "Mint"],
                "nicotine_level": "20 mg",
            }))
            .send()
            .await
            .expect("Failed to create product");
        assert_eq!(resp.status(), StatusCode::CREATED, "product create failed");

        let body: Value = resp.json().await.expect("Invalid product response");
        body["product"].clone()
    }
}
