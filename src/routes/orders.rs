//! Order route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{confirm_delivery, create_order, get_order};
use crate::state::AppState;

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create_order))
        .route("/api/orders/:id", get(get_order))
        .route("/api/orders/:id/confirm", post(confirm_delivery))
}
