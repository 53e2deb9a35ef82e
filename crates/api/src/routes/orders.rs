//! Order handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use crate::db::{OrderRepository, UserRepository};
use crate::error::{ApiJson, ApiPath, AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::order::{CreateOrderRequest, OrderView};
use crate::services::notifications::spawn_order_notifications;
use crate::services::orders::OrderService;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedOrderResponse {
    pub message: &'static str,
    pub order: OrderView,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: OrderView,
}

/// `POST /api/orders/cod`
///
/// Responds as soon as the order is stored; emails and WhatsApp notices
/// go out in the background.
#[instrument(skip(state, request), fields(user_id = %user.id))]
pub async fn create_cod(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreatedOrderResponse>)> {
    let (order, details) = OrderService::new(state.pool(), state.config().order_tax_rate)
        .place_cod_order(user.id, request)
        .await?;

    match UserRepository::new(state.pool()).get_by_id(user.id).await {
        Ok(Some(customer)) => spawn_order_notifications(state.clone(), details.clone(), customer),
        Ok(None) => tracing::warn!(
            order_number = %order.order_number,
            "Customer vanished after checkout; notifications skipped"
        ),
        Err(e) => tracing::error!(
            order_number = %order.order_number,
            error = %e,
            "Could not load customer; notifications left to the retry sweep"
        ),
    }

    Ok((
        StatusCode::CREATED,
        Json(CreatedOrderResponse {
            message: "COD order created successfully",
            order: OrderView::new(order, Some(details.invoice_number)),
        }),
    ))
}

/// `GET /api/orders/{order_id}`: visible to the owner and admins only.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(order_id): ApiPath<String>,
) -> Result<Json<OrderResponse>> {
    let not_found = || AppError::NotFound("Order not found".to_string());

    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_by_number(&order_id)
        .await?
        .filter(|order| caller.can_access(order.user_id))
        .ok_or_else(not_found)?;

    let invoice_number = repo
        .get_details(&order_id)
        .await?
        .map(|details| details.invoice_number);

    Ok(Json(OrderResponse {
        order: OrderView::new(order, invoice_number),
    }))
}
