//! Dispute models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

/// Dispute model; at most one per order
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Dispute {
    pub id: Uuid,
    pub order_id: Uuid,
    pub opened_by: Uuid,
    pub reason: String,
    pub note: Option<String>,
    pub status: DisputeStatus,
    pub resolution: Option<DisputeResolution>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Resolver-supplied context (split amounts, case references)
    pub meta: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

/// Dispute status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DisputeStatus {
    Open,
    Resolved,
}

/// How a dispute routes the escrowed funds
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    /// Full refund to the buyer; order ends REFUNDED
    RefundBuyer,
    /// Full payout to the seller; order ends COMPLETED
    ReleaseSeller,
    /// Explicit split between the parties; order ends COMPLETED
    Partial,
}

/// Request DTO for opening a dispute
#[derive(Debug, Deserialize, Validate)]
pub struct OpenDisputeRequest {
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
}

/// Request DTO for resolving a dispute
#[derive(Debug, Deserialize)]
pub struct ResolveDisputeRequest {
    pub resolution: DisputeResolution,
    /// Required for PARTIAL; must be strictly between zero and the order amount
    pub buyer_amount: Option<i64>,
    pub meta: Option<serde_json::Value>,
}
