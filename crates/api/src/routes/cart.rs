//! Cart handlers.
//!
//! The acting user always comes from the token. Routes that name a user in
//! the path only serve that user, or an admin.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::instrument;

use exprz_core::{CartItemId, UserId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::{ApiJson, ApiPath, AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::MessageResponse;
use crate::models::cart::{
    AddToCartRequest, CartItem, CartLine, UpdateCartRequest, normalize_flavour, valid_quantity,
};
use crate::routes::entity_error;
use crate::state::AppState;

const ITEM_NOT_FOUND: &str = "Cart item not found";

fn invalid_quantity() -> AppError {
    AppError::BadRequest("Valid quantity is required".to_string())
}

/// `POST /api/cart`: add a line, merging with an identical one.
#[instrument(skip(state, request), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartItem>)> {
    let product_id = request
        .product_id
        .ok_or_else(|| AppError::BadRequest("Product ID is required".to_string()))?;
    let quantity =
        valid_quantity(Some(request.quantity.unwrap_or(1))).ok_or_else(invalid_quantity)?;
    let flavour = normalize_flavour(request.flavour);

    ProductRepository::new(state.pool())
        .get_active(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let item = CartRepository::new(state.pool())
        .add(user.id, product_id, flavour.as_deref(), quantity)
        .await?
        .ok_or_else(invalid_quantity)?;

    let product = product_id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product.as_str())]));

    Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /api/cart/{user_id}`
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<Vec<CartLine>>> {
    caller.ensure_can_access(user_id)?;

    let lines = CartRepository::new(state.pool())
        .list_for_user(user_id)
        .await?;

    Ok(Json(lines))
}

/// `PUT /api/cart/{id}`
#[instrument(skip(state, request), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CartItemId>,
    ApiJson(request): ApiJson<UpdateCartRequest>,
) -> Result<Json<CartItem>> {
    let quantity = valid_quantity(request.quantity).ok_or_else(invalid_quantity)?;

    let item = CartRepository::new(state.pool())
        .update_quantity(id, user.id, quantity)
        .await
        .map_err(entity_error(ITEM_NOT_FOUND))?;

    Ok(Json(item))
}

/// `DELETE /api/cart/{id}`
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<CartItemId>,
) -> Result<Json<MessageResponse>> {
    CartRepository::new(state.pool())
        .delete(id, user.id)
        .await
        .map_err(entity_error(ITEM_NOT_FOUND))?;

    Ok(Json(MessageResponse::new("Item removed from cart")))
}

/// `DELETE /api/cart/clear/{user_id}`
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(user_id): ApiPath<UserId>,
) -> Result<Json<MessageResponse>> {
    caller.ensure_can_access(user_id)?;

    let removed = CartRepository::new(state.pool()).clear(user_id).await?;
    tracing::debug!(user_id = %user_id, removed, "Cart cleared");

    Ok(Json(MessageResponse::new("Cart cleared successfully")))
}
