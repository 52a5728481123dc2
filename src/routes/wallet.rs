//! Wallet route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{deposit, get_wallet, list_transactions, withdraw};
use crate::state::AppState;

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wallet", get(get_wallet))
        .route("/api/wallet/transactions", get(list_transactions))
        .route("/api/wallet/deposit", post(deposit))
        .route("/api/wallet/withdraw", post(withdraw))
}
