//! Dispute route definitions

use axum::{routing::post, Router};

use crate::handlers::{open_dispute, resolve_dispute};
use crate::state::AppState;

pub fn dispute_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders/:id/dispute", post(open_dispute))
        .route("/api/disputes/:id/resolve", post(resolve_dispute))
}
