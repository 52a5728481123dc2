//! Order API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::middleware::AuthenticatedUser;
use crate::models::ApiResponse;
use crate::orders::{CreateOrderRequest, Order, OrderService};

/// Purchase a listing, opening an escrowed order
pub async fn create_order(
    State(orders): State<Arc<OrderService>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<Order>>, CoreError> {
    let order = orders.create_order(user.id, request).await?;

    Ok(Json(ApiResponse::ok(order)))
}

/// Get an order; overdue escrows settle before the response is built
pub async fn get_order(
    State(orders): State<Arc<OrderService>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, CoreError> {
    let order = orders.get_order(id, Some(user.id)).await?;

    Ok(Json(ApiResponse::ok(order)))
}

/// Buyer confirms delivery, releasing the escrow to the seller
pub async fn confirm_delivery(
    State(orders): State<Arc<OrderService>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, CoreError> {
    let order = orders.confirm_delivery(id, user.id).await?;

    Ok(Json(ApiResponse::ok(order)))
}
