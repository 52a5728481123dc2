//! Route definitions for the escrow core API

mod disputes;
mod orders;
mod wallet;

pub use disputes::dispute_routes;
pub use orders::order_routes;
pub use wallet::wallet_routes;

use axum::{routing::get, Router};

use crate::handlers::health_check;
use crate::state::AppState;

/// The full API router, without state or middleware layers applied
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .merge(wallet_routes())
        .merge(order_routes())
        .merge(dispute_routes())
}
