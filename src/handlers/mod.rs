//! API handlers

mod disputes;
mod orders;
mod wallet;

pub use disputes::*;
pub use orders::*;
pub use wallet::*;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::db::Database;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// Health check endpoint with a database probe
pub async fn health_check(State(db): State<Database>) -> Json<HealthResponse> {
    let database = if db.is_healthy().await {
        "connected".to_string()
    } else {
        "error".to_string()
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
