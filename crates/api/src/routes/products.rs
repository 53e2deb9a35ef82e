//! Product handlers, public and admin.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use exprz_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{ApiJson, ApiPath, AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::MessageResponse;
use crate::models::product::{ProductInput, ProductView, StatusInput};
use crate::routes::entity_error;
use crate::state::AppState;

const NOT_FOUND: &str = "Product not found";

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub message: &'static str,
    pub product: ProductView,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub is_active: bool,
}

/// `GET /api/products`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list(false).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// `GET /api/products/{id}`
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    Ok(Json(product.into()))
}

/// `GET /api/admin/products`
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<ProductView>>> {
    let products = ProductRepository::new(state.pool()).list(true).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

/// `GET /api/admin/products/{id}`
pub async fn admin_show(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ProductView>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    Ok(Json(product.into()))
}

/// `POST /api/admin/products`
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let changes = input.into_new()?;
    let product = ProductRepository::new(state.pool()).create(&changes).await?;

    tracing::info!(product_id = %product.id, "Product created");

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created successfully",
            product: product.into(),
        }),
    ))
}

/// `PUT /api/admin/products/{id}`
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<ProductResponse>> {
    let repo = ProductRepository::new(state.pool());
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    let changes = input.into_update(&current)?;
    let product = repo
        .update(id, &changes)
        .await
        .map_err(entity_error(NOT_FOUND))?;

    Ok(Json(ProductResponse {
        message: "Product updated successfully",
        product: product.into(),
    }))
}

/// `DELETE /api/admin/products/{id}`: deactivates the product.
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<MessageResponse>> {
    ProductRepository::new(state.pool())
        .set_active(id, false)
        .await
        .map_err(entity_error(NOT_FOUND))?;

    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

/// `PATCH /api/admin/products/{id}/status`
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<StatusInput>,
) -> Result<Json<StatusResponse>> {
    let is_active = input
        .flag()
        .ok_or_else(|| AppError::BadRequest("Invalid status value".to_string()))?;

    ProductRepository::new(state.pool())
        .set_active(id, is_active)
        .await
        .map_err(entity_error(NOT_FOUND))?;

    Ok(Json(StatusResponse {
        message: status_message(is_active),
        is_active,
    }))
}

const fn status_message(is_active: bool) -> &'static str {
    if is_active {
        "Product activated successfully"
    } else {
        "Product deactivated successfully"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::routes::tests::{json_body, send, state, token_for};

    #[test]
    fn test_status_message() {
        assert_eq!(status_message(true), "Product activated successfully");
        assert_eq!(status_message(false), "Product deactivated successfully");
    }

    #[tokio::test]
    async fn test_create_validates_before_database() {
        let state = state();
        let token = token_for(&state, 1, true);
        let response = send(
            &state,
            "POST",
            "/api/admin/products",
            Some(&token),
            Some(json!({"name": "Mango Ice", "price": 5.99})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Name, brand, and price are required fields"
        );
    }

    #[tokio::test]
    async fn test_status_requires_boolean() {
        let state = state();
        let token = token_for(&state, 1, true);
        let response = send(
            &state,
            "PATCH",
            "/api/admin/products/4/status",
            Some(&token),
            Some(json!({"is_active": "yes"})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid status value");
    }

    #[tokio::test]
    async fn test_malformed_id_is_json_bad_request() {
        let state = state();
        let response = send(&state, "GET", "/api/products/abc", None, None).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid ID format");
    }

    #[tokio::test]
    async fn test_admin_malformed_id_is_json_bad_request() {
        let state = state();
        let token = token_for(&state, 1, true);
        let response = send(
            &state,
            "PATCH",
            "/api/admin/products/12x/status",
            Some(&token),
            Some(json!({"is_active": true})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid ID format");
    }

    #[tokio::test]
    async fn test_customer_cannot_create() {
        let state = state();
        let token = token_for(&state, 2, false);
        let response = send(
            &state,
            "POST",
            "/api/admin/products",
            Some(&token),
            Some(json!({"name": "X", "brand": "Y", "price": 1})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
