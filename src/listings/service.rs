//! Listing service layer

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CoreError, CoreResult};
use crate::listings::{CreateListingRequest, Listing, ListingStatus};

#[derive(Clone)]
pub struct ListingService {
    db_pool: SqlitePool,
}

impl ListingService {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Create a listing (seeding and tests; listing management is external)
    pub async fn create_listing(&self, request: CreateListingRequest) -> CoreResult<Listing> {
        request.validate()?;

        let now = Utc::now();
        let listing = sqlx::query_as::<_, Listing>(
            r#"
            INSERT INTO listings (id, seller_id, title, price, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.seller_id)
        .bind(&request.title)
        .bind(request.price)
        .bind(ListingStatus::Active)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(listing)
    }

    /// Get a listing by ID
    pub async fn get_listing(&self, id: Uuid) -> CoreResult<Listing> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(CoreError::NotFound("listing not found".to_string()))?;

        Ok(listing)
    }

    /// Fetch a listing inside an open transaction
    pub async fn fetch_listing_tx(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> CoreResult<Listing> {
        let listing = sqlx::query_as::<_, Listing>("SELECT * FROM listings WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or(CoreError::NotFound("listing not found".to_string()))?;

        Ok(listing)
    }

    /// Flip a listing to sold inside the purchase transaction.
    ///
    /// Conditional on the listing still being active and not soft-deleted, so
    /// a concurrent purchase that already claimed it surfaces as a conflict.
    pub async fn mark_sold_tx(&self, conn: &mut SqliteConnection, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET status = 'sold', updated_at = ?1
            WHERE id = ?2 AND status = 'active' AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::Conflict(
                "listing is no longer available".to_string(),
            ));
        }

        Ok(())
    }
}
