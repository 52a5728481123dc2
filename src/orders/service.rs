//! Order service layer - escrow lifecycle business logic
//!
//! Every mutation here runs inside a single database transaction covering the
//! ledger moves, the order state change, the conversation row, and the
//! notification enqueue. State transitions are claimed with conditional
//! updates so concurrent callers cannot settle the same escrow twice.

use chrono::{DateTime, Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::listings::{ListingService, ListingStatus};
use crate::notifications::NotificationService;
use crate::orders::{CreateOrderRequest, Order, OrderStatus};
use crate::users::UserService;
use crate::wallet::{SettlementTrigger, TxMeta, WalletService};

pub struct OrderService {
    db_pool: SqlitePool,
    wallets: WalletService,
    listings: ListingService,
    users: UserService,
    notifications: NotificationService,
    auto_release_window: Duration,
}

impl OrderService {
    pub fn new(
        db_pool: SqlitePool,
        wallets: WalletService,
        listings: ListingService,
        users: UserService,
        notifications: NotificationService,
        auto_release_window: Duration,
    ) -> Self {
        Self {
            db_pool,
            wallets,
            listings,
            users,
            notifications,
            auto_release_window,
        }
    }

    /// Purchase a listing: hold buyer funds and open the escrow.
    ///
    /// One transaction covers the listing claim, the hold, the order row, the
    /// conversation, and the seller notification. A second buyer on the same
    /// listing observes `Conflict`, whether they arrive after the sale or
    /// lose the conditional listing update mid-race.
    pub async fn create_order(
        &self,
        buyer_id: Uuid,
        request: CreateOrderRequest,
    ) -> CoreResult<Order> {
        let mut tx = self.db_pool.begin().await?;

        let listing = self
            .listings
            .fetch_listing_tx(&mut tx, request.listing_id)
            .await?;

        // A sold listing is a conflict whether the rival purchase committed
        // before or during this transaction; removed listings are just gone.
        if listing.status == ListingStatus::Sold {
            return Err(CoreError::Conflict("listing already sold".to_string()));
        }
        if !listing.is_purchasable() {
            return Err(CoreError::InvalidState(
                "listing is not open for purchase".to_string(),
            ));
        }
        if listing.seller_id == buyer_id {
            return Err(CoreError::Validation(
                "cannot purchase your own listing".to_string(),
            ));
        }

        self.listings.mark_sold_tx(&mut tx, listing.id).await?;

        let order_id = Uuid::new_v4();
        self.wallets
            .hold_tx(
                &mut tx,
                buyer_id,
                listing.price,
                Some(order_id),
                Some(TxMeta::OrderHold {
                    order_id,
                    listing_id: listing.id,
                }),
            )
            .await?;

        let now = Utc::now();
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO marketplace_orders
                (id, listing_id, buyer_id, seller_id, amount, status,
                 auto_release_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(listing.id)
        .bind(buyer_id)
        .bind(listing.seller_id)
        .bind(listing.price)
        .bind(OrderStatus::PendingDelivery)
        .bind(now + self.auto_release_window)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO trade_conversations (id, order_id, is_locked, created_at)
            VALUES (?1, ?2, 0, ?3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        self.notifications
            .enqueue_tx(
                &mut tx,
                listing.seller_id,
                "Your listing sold",
                &format!(
                    "\"{}\" was purchased; {} is held in escrow until delivery is confirmed",
                    listing.title, order.amount
                ),
                Some(format!("/orders/{}", order.id)),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            listing_id = %listing.id,
            buyer_id = %buyer_id,
            amount = order.amount,
            "order created, funds escrowed"
        );

        Ok(order)
    }

    /// Buyer confirms delivery: settle the escrow to the seller
    pub async fn confirm_delivery(&self, order_id: Uuid, buyer_id: Uuid) -> CoreResult<Order> {
        let mut tx = self.db_pool.begin().await?;

        let order = self.fetch_order_tx(&mut tx, order_id).await?;

        if order.buyer_id != buyer_id {
            return Err(CoreError::Forbidden(
                "only the buyer can confirm delivery".to_string(),
            ));
        }
        if order.status != OrderStatus::PendingDelivery {
            return Err(CoreError::InvalidState(format!(
                "order is not awaiting delivery (status: {:?})",
                order.status
            )));
        }

        let order = self.claim_completion_tx(&mut tx, order_id).await?.ok_or(
            CoreError::InvalidState("order is not awaiting delivery".to_string()),
        )?;

        self.wallets
            .release_tx(
                &mut tx,
                order.buyer_id,
                order.seller_id,
                order.amount,
                Some(order.id),
                Some(TxMeta::OrderSettlement {
                    order_id: order.id,
                    trigger: SettlementTrigger::BuyerConfirmation,
                }),
            )
            .await?;

        self.lock_conversation_tx(&mut tx, order.id).await?;

        self.notifications
            .enqueue_tx(
                &mut tx,
                order.seller_id,
                "Escrow released",
                &format!(
                    "The buyer confirmed delivery; {} was released to your wallet",
                    order.amount
                ),
                Some(format!("/orders/{}", order.id)),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, "delivery confirmed, escrow settled");

        Ok(order)
    }

    /// Release an overdue escrow to the seller on the system's behalf.
    ///
    /// Idempotent: returns `None` without any effect when the order is
    /// missing, not pending, not yet due, or suspended by an open dispute.
    /// The conditional update is the claim; of any number of concurrent
    /// callers exactly one settles the escrow.
    pub async fn auto_release_order(&self, order_id: Uuid) -> CoreResult<Option<Order>> {
        let mut tx = self.db_pool.begin().await?;

        let now = Utc::now();
        let claimed = sqlx::query_as::<_, Order>(
            r#"
            UPDATE marketplace_orders
            SET status = 'completed', completed_at = ?1, updated_at = ?1
            WHERE id = ?2
              AND status = 'pending_delivery'
              AND auto_release_at IS NOT NULL
              AND auto_release_at <= ?1
              AND NOT EXISTS (
                  SELECT 1 FROM disputes
                  WHERE disputes.order_id = ?2 AND disputes.status = 'open'
              )
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;

        let order = match claimed {
            Some(order) => order,
            None => return Ok(None),
        };

        self.wallets
            .release_tx(
                &mut tx,
                order.buyer_id,
                order.seller_id,
                order.amount,
                Some(order.id),
                Some(TxMeta::OrderSettlement {
                    order_id: order.id,
                    trigger: SettlementTrigger::AutoRelease,
                }),
            )
            .await?;

        self.lock_conversation_tx(&mut tx, order.id).await?;

        self.notifications
            .enqueue_tx(
                &mut tx,
                order.seller_id,
                "Escrow released",
                &format!(
                    "The delivery window closed; {} was released to your wallet",
                    order.amount
                ),
                Some(format!("/orders/{}", order.id)),
            )
            .await?;
        self.notifications
            .enqueue_tx(
                &mut tx,
                order.buyer_id,
                "Order auto-completed",
                "The delivery window closed without a dispute, so the escrow was released to the seller",
                Some(format!("/orders/{}", order.id)),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, "escrow auto-released");

        Ok(Some(order))
    }

    /// Get an order, visible to its parties and staff only.
    ///
    /// Passing `None` as the requesting user is the internal/system path and
    /// skips the access check. When the auto-release deadline has passed this
    /// settles the escrow first and returns the updated order.
    pub async fn get_order(
        &self,
        order_id: Uuid,
        requesting_user: Option<Uuid>,
    ) -> CoreResult<Order> {
        let order = self.fetch_order(order_id).await?;

        if let Some(user_id) = requesting_user {
            if !order.involves(user_id) {
                let user = self.users.get_user(user_id).await?;
                if !user.role.is_staff() {
                    return Err(CoreError::Forbidden(
                        "not a party to this order".to_string(),
                    ));
                }
            }
        }

        if order.is_release_due(Utc::now()) {
            return match self.auto_release_order(order.id).await? {
                Some(updated) => Ok(updated),
                // Lost the release race or a dispute landed first; re-read
                None => self.fetch_order(order_id).await,
            };
        }

        Ok(order)
    }

    /// Orders whose deadline has passed with no open dispute, for the sweeper
    pub async fn due_order_ids(&self, limit: i64) -> CoreResult<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            r#"
            SELECT id FROM marketplace_orders o
            WHERE status = 'pending_delivery'
              AND auto_release_at IS NOT NULL
              AND auto_release_at <= ?1
              AND NOT EXISTS (
                  SELECT 1 FROM disputes
                  WHERE disputes.order_id = o.id AND disputes.status = 'open'
              )
            ORDER BY auto_release_at ASC
            LIMIT ?2
            "#,
        )
        .bind(Utc::now())
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    // ===== Transaction-scoped helpers (shared with dispute resolution) =====

    /// Fetch an order inside an open transaction
    pub async fn fetch_order_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: Uuid,
    ) -> CoreResult<Order> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM marketplace_orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(conn)
            .await?
            .ok_or(CoreError::NotFound("order not found".to_string()))?;

        Ok(order)
    }

    /// Claim the PENDING_DELIVERY -> DISPUTED transition
    pub async fn mark_disputed_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> CoreResult<Order> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE marketplace_orders
            SET status = 'disputed', disputed_at = ?1, updated_at = ?1
            WHERE id = ?2 AND status = 'pending_delivery'
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or(CoreError::InvalidState(
            "order is not awaiting delivery".to_string(),
        ))?;

        Ok(order)
    }

    /// Claim the DISPUTED -> COMPLETED transition
    pub async fn settle_disputed_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> CoreResult<Order> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE marketplace_orders
            SET status = 'completed', completed_at = ?1, updated_at = ?1
            WHERE id = ?2 AND status = 'disputed'
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or(CoreError::InvalidState(
            "order is not under dispute".to_string(),
        ))?;

        Ok(order)
    }

    /// Claim the DISPUTED -> REFUNDED transition
    pub async fn refund_disputed_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: Uuid,
        now: DateTime<Utc>,
    ) -> CoreResult<Order> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE marketplace_orders
            SET status = 'refunded', updated_at = ?1
            WHERE id = ?2 AND status = 'disputed'
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or(CoreError::InvalidState(
            "order is not under dispute".to_string(),
        ))?;

        Ok(order)
    }

    /// Lock the order's conversation; terminal orders accept no more messages
    pub async fn lock_conversation_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: Uuid,
    ) -> CoreResult<()> {
        sqlx::query(
            r#"
            UPDATE trade_conversations
            SET is_locked = 1, locked_at = ?1
            WHERE order_id = ?2 AND is_locked = 0
            "#,
        )
        .bind(Utc::now())
        .bind(order_id)
        .execute(conn)
        .await?;

        Ok(())
    }

    async fn fetch_order(&self, order_id: Uuid) -> CoreResult<Order> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM marketplace_orders WHERE id = ?1")
            .bind(order_id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(CoreError::NotFound("order not found".to_string()))?;

        Ok(order)
    }

    /// Claim the PENDING_DELIVERY -> COMPLETED transition
    async fn claim_completion_tx(
        &self,
        conn: &mut SqliteConnection,
        order_id: Uuid,
    ) -> CoreResult<Option<Order>> {
        let now = Utc::now();
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE marketplace_orders
            SET status = 'completed', completed_at = ?1, updated_at = ?1
            WHERE id = ?2 AND status = 'pending_delivery'
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?;

        Ok(order)
    }
}
