//! Listing models and data structures

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Marketplace listing model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    /// Price in minor currency units
    pub price: i64,
    pub status: ListingStatus,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// A listing can be purchased only while active and not soft-deleted
    pub fn is_purchasable(&self) -> bool {
        self.status == ListingStatus::Active && self.deleted_at.is_none()
    }
}

/// Listing status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
    Removed,
}

/// Request DTO for creating a listing
#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    pub seller_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(range(min = 1))]
    pub price: i64,
}
