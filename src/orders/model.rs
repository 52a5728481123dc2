//! Order models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

/// Marketplace order model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Order {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    /// Escrowed amount in minor units, fixed at creation from the listing price
    pub amount: i64,
    pub status: OrderStatus,
    /// Deadline after which escrow releases to the seller without confirmation
    pub auto_release_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the given user is the buyer or seller on this order
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    /// Terminal orders never change state again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Completed | OrderStatus::Refunded | OrderStatus::Cancelled
        )
    }

    /// The auto-release deadline has passed and was never suspended
    pub fn is_release_due(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::PendingDelivery
            && self.auto_release_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Order escrow states
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Funds held, waiting for the buyer to confirm delivery
    PendingDelivery,
    /// Escrow paid out to the seller
    Completed,
    /// Escrow returned to the buyer
    Refunded,
    /// An open dispute suspends settlement
    Disputed,
    /// Closed before funds moved
    Cancelled,
}

/// Request DTO for purchasing a listing
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub listing_id: Uuid,
}

/// Per-order conversation between buyer and seller
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct TradeConversation {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Locked conversations accept no further messages
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
}
