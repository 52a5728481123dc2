//! Dispute API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::disputes::{Dispute, DisputeService, OpenDisputeRequest, ResolveDisputeRequest};
use crate::error::CoreError;
use crate::middleware::{AuthenticatedUser, StaffUser};
use crate::models::ApiResponse;

/// Buyer opens a dispute on an order awaiting delivery
pub async fn open_dispute(
    State(disputes): State<Arc<DisputeService>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<OpenDisputeRequest>,
) -> Result<Json<ApiResponse<Dispute>>, CoreError> {
    let dispute = disputes.open_dispute(order_id, user.id, request).await?;

    Ok(Json(ApiResponse::ok(dispute)))
}

/// Staff resolves an open dispute, routing the escrowed funds
pub async fn resolve_dispute(
    State(disputes): State<Arc<DisputeService>>,
    StaffUser(staff): StaffUser,
    Path(dispute_id): Path<Uuid>,
    Json(request): Json<ResolveDisputeRequest>,
) -> Result<Json<ApiResponse<Dispute>>, CoreError> {
    let dispute = disputes.resolve_dispute(dispute_id, staff.id, request).await?;

    Ok(Json(ApiResponse::ok(dispute)))
}
