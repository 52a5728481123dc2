//! Wallet API handlers

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::error::CoreError;
use crate::middleware::AuthenticatedUser;
use crate::models::{ApiResponse, PaginatedResponse};
use crate::wallet::{
    DepositRequest, TxFilter, Wallet, WalletService, WalletTransaction, WithdrawRequest,
};

/// Get the caller's wallet balances
pub async fn get_wallet(
    State(wallets): State<Arc<WalletService>>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<ApiResponse<Wallet>>, CoreError> {
    let wallet = wallets.get_or_create_wallet(user.id).await?;

    Ok(Json(ApiResponse::ok(wallet)))
}

/// List the caller's ledger entries with filtering and pagination
pub async fn list_transactions(
    State(wallets): State<Arc<WalletService>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(filter): Query<TxFilter>,
) -> Result<Json<ApiResponse<PaginatedResponse<WalletTransaction>>>, CoreError> {
    let page = wallets.list_transactions(user.id, filter).await?;

    Ok(Json(ApiResponse::ok(page)))
}

/// Credit the caller's available balance from an external provider
pub async fn deposit(
    State(wallets): State<Arc<WalletService>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<DepositRequest>,
) -> Result<Json<ApiResponse<WalletTransaction>>, CoreError> {
    let entry = wallets.deposit(user.id, request).await?;

    Ok(Json(ApiResponse::ok(entry)))
}

/// Debit the caller's available balance toward an external provider
pub async fn withdraw(
    State(wallets): State<Arc<WalletService>>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<ApiResponse<WalletTransaction>>, CoreError> {
    let entry = wallets.withdraw(user.id, request).await?;

    Ok(Json(ApiResponse::ok(entry)))
}
