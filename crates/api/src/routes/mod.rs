//! HTTP route handlers for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (strict rate limit)
//! POST   /api/auth/signup-request-otp   - Start signup, email a code
//! POST   /api/auth/verify-otp           - Complete signup
//! POST   /api/auth/resend-otp           - Email a fresh code
//! POST   /api/auth/login                - Email + password login
//! GET    /api/protected                 - Token check
//!
//! # Catalog (public)
//! GET    /api/products                  - Active products
//! GET    /api/products/{id}             - One active product
//! GET    /api/categories                - Active categories
//!
//! # Catalog (admin)
//! GET    /api/admin/products            - All products
//! POST   /api/admin/products            - Create product
//! GET    /api/admin/products/{id}       - One product
//! PUT    /api/admin/products/{id}       - Update product
//! DELETE /api/admin/products/{id}       - Soft delete
//! PATCH  /api/admin/products/{id}/status
//! GET    /api/admin/categories          - All categories
//! POST   /api/admin/categories          - Create category
//! GET    /api/admin/categories/{id}     - One category
//! PUT    /api/admin/categories/{id}     - Update category
//! DELETE /api/admin/categories/{id}     - Soft delete
//! PATCH  /api/admin/categories/{id}/status
//!
//! # Cart (token)
//! POST   /api/cart                      - Add or merge a line
//! GET    /api/cart/{user_id}            - A user's lines
//! PUT    /api/cart/{id}                 - Set a line's quantity
//! DELETE /api/cart/{id}                 - Remove a line
//! DELETE /api/cart/clear/{user_id}      - Empty a cart
//!
//! # Orders (token)
//! POST   /api/orders/cod                - Place a cash-on-delivery order
//! GET    /api/orders/{order_id}         - One order
//! ```

pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Map repository errors for a single-entity route.
///
/// `NotFound` becomes a 404 with `message`; unique violations become 409.
pub(crate) fn entity_error(message: &str) -> impl FnOnce(RepositoryError) -> AppError + '_ {
    move |err| match err {
        RepositoryError::NotFound => AppError::NotFound(message.to_string()),
        RepositoryError::Conflict(reason) => AppError::Conflict(reason),
        other => AppError::Database(other),
    }
}

/// Signup and login routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup-request-otp", post(auth::signup_request_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/login", post(auth::login))
}

/// Public product routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Public category routes.
pub fn category_routes() -> Router<AppState> {
    Router::new().route("/", get(categories::index))
}

/// Admin catalog routes. Every handler takes `RequireAdmin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(products::admin_index).post(products::create),
        )
        .route(
            "/products/{id}",
            get(products::admin_show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/products/{id}/status", patch(products::set_status))
        .route(
            "/categories",
            get(categories::admin_index).post(categories::create),
        )
        .route(
            "/categories/{id}",
            get(categories::admin_show)
                .put(categories::update)
                .delete(categories::destroy),
        )
        .route("/categories/{id}/status", patch(categories::set_status))
}

/// Cart routes. `GET` and `PUT`/`DELETE` on `/{id}` share a path, so the
/// segment is a user id for `GET` and a line id otherwise.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(cart::add))
        .route(
            "/{id}",
            get(cart::show).put(cart::update).delete(cart::remove),
        )
        .route("/clear/{user_id}", axum::routing::delete(cart::clear))
}

/// Order routes.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/cod", post(orders::create_cod))
        .route("/{order_id}", get(orders::show))
}

/// Create all `/api` routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/admin", admin_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .route("/protected", get(auth::protected))
        .layer(api_rate_limiter());

    Router::new()
        .nest("/api/auth", auth_routes().layer(auth_rate_limiter()))
        .nest("/api", api)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use chrono::Utc;
    use exprz_core::{Email, UserId, UserRole};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::test_support;
    use crate::db::create_lazy_pool;
    use crate::models::user::User;

    pub(crate) fn state() -> AppState {
        let config = test_support::config();
        let pool = create_lazy_pool(&config.database_url).unwrap();
        AppState::new(config, pool).unwrap()
    }

    pub(crate) fn token_for(state: &AppState, id: i32, is_admin: bool) -> String {
        let user = User {
            id: UserId::new(id),
            username: format!("user{id}"),
            email: Email::parse(&format!("user{id}@exprz.test")).unwrap(),
            role: UserRole::from_admin_flag(is_admin),
            is_admin,
            phone: "7700900123".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.tokens().issue(&user).unwrap()
    }

    pub(crate) async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.10");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        routes()
            .with_state(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    pub(crate) async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_entity_error_mapping() {
        assert!(matches!(
            entity_error("Product not found")(RepositoryError::NotFound),
            AppError::NotFound(msg) if msg == "Product not found"
        ));
        assert!(matches!(
            entity_error("x")(RepositoryError::Conflict("dup".to_string())),
            AppError::Conflict(msg) if msg == "dup"
        ));
        assert!(matches!(
            entity_error("x")(RepositoryError::DataCorruption("bad".to_string())),
            AppError::Database(_)
        ));
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let state = state();
        let response = send(&state, "GET", "/api/admin/products", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "No token provided");
    }

    #[tokio::test]
    async fn test_admin_routes_reject_customers() {
        let state = state();
        let token = token_for(&state, 7, false);
        let response = send(&state, "DELETE", "/api/admin/categories/3", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let state = state();
        let response = send(&state, "GET", "/api/protected", Some("not.a.jwt"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "Invalid or expired token");
    }
}
