//! Category handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Serialize;

use exprz_core::CategoryId;

use crate::db::CategoryRepository;
use crate::error::{ApiJson, ApiPath, AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::MessageResponse;
use crate::models::category::{Category, CategoryInput};
use crate::models::product::StatusInput;
use crate::routes::entity_error;
use crate::state::AppState;

const NOT_FOUND: &str = "Category not found";

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub message: &'static str,
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub is_active: bool,
}

/// `GET /api/categories`
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list(false).await?))
}

/// `GET /api/admin/categories`
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list(true).await?))
}

/// `GET /api/admin/categories/{id}`
pub async fn admin_show(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))
}

/// `POST /api/admin/categories`
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<CategoryResponse>)> {
    let changes = input.into_new()?;
    let category = CategoryRepository::new(state.pool())
        .create(&changes)
        .await
        .map_err(entity_error(NOT_FOUND))?;

    tracing::info!(category_id = %category.id, name = %category.name, "Category created");

    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            message: "Category created successfully",
            category,
        }),
    ))
}

/// `PUT /api/admin/categories/{id}`
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<Json<CategoryResponse>> {
    let repo = CategoryRepository::new(state.pool());
    let current = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(NOT_FOUND.to_string()))?;

    let changes = input.into_update(&current)?;
    let category = repo
        .update(id, &changes)
        .await
        .map_err(entity_error(NOT_FOUND))?;

    Ok(Json(CategoryResponse {
        message: "Category updated successfully",
        category,
    }))
}

/// `DELETE /api/admin/categories/{id}`: deactivates the category.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<MessageResponse>> {
    CategoryRepository::new(state.pool())
        .set_active(id, false)
        .await
        .map_err(entity_error(NOT_FOUND))?;

    Ok(Json(MessageResponse::new("Category deleted successfully")))
}

/// `PATCH /api/admin/categories/{id}/status`
pub async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(input): ApiJson<StatusInput>,
) -> Result<Json<StatusResponse>> {
    let is_active = input
        .flag()
        .ok_or_else(|| AppError::BadRequest("Invalid status value".to_string()))?;

    CategoryRepository::new(state.pool())
        .set_active(id, is_active)
        .await
        .map_err(entity_error(NOT_FOUND))?;

    let message = if is_active {
        "Category activated successfully"
    } else {
        "Category deactivated successfully"
    };

    Ok(Json(StatusResponse { message, is_active }))
}
