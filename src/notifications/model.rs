//! Notification outbox models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Outbox notification row
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    /// Optional deep link into the marketplace UI
    pub link: Option<String>,
    /// Failed delivery attempts so far
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    /// Set once the dispatcher has delivered this row
    pub dispatched_at: Option<DateTime<Utc>>,
}
