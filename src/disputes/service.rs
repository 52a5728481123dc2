//! Dispute service layer - opening and resolving escrow disputes
//!
//! Resolution validates the payout split before any ledger movement, claims
//! the dispute row with a conditional update, and settles the order inside
//! the same transaction.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::disputes::{
    Dispute, DisputeResolution, DisputeStatus, OpenDisputeRequest, ResolveDisputeRequest,
};
use crate::error::{CoreError, CoreResult};
use crate::notifications::NotificationService;
use crate::orders::{Order, OrderService, OrderStatus};
use crate::users::UserService;
use crate::wallet::{TxMeta, WalletService};

pub struct DisputeService {
    db_pool: SqlitePool,
    wallets: WalletService,
    users: UserService,
    orders: Arc<OrderService>,
    notifications: NotificationService,
}

impl DisputeService {
    pub fn new(
        db_pool: SqlitePool,
        wallets: WalletService,
        users: UserService,
        orders: Arc<OrderService>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            db_pool,
            wallets,
            users,
            orders,
            notifications,
        }
    }

    /// Open a dispute on an order awaiting delivery. Buyer only; freezes the
    /// escrow (suspending auto-release) until staff resolve it. No funds move.
    pub async fn open_dispute(
        &self,
        order_id: Uuid,
        opened_by: Uuid,
        request: OpenDisputeRequest,
    ) -> CoreResult<Dispute> {
        request.validate()?;

        let mut tx = self.db_pool.begin().await?;

        let order = self.orders.fetch_order_tx(&mut tx, order_id).await?;

        if order.buyer_id != opened_by {
            return Err(CoreError::Forbidden(
                "only the buyer can open a dispute".to_string(),
            ));
        }
        if order.status == OrderStatus::Disputed {
            return Err(CoreError::Conflict(
                "a dispute is already open for this order".to_string(),
            ));
        }
        if order.is_terminal() {
            return Err(CoreError::InvalidState(format!(
                "order cannot be disputed (status: {:?})",
                order.status
            )));
        }

        let now = Utc::now();
        self.orders.mark_disputed_tx(&mut tx, order_id, now).await?;

        // The unique index on order_id turns a duplicate into Conflict
        let dispute = sqlx::query_as::<_, Dispute>(
            r#"
            INSERT INTO disputes (id, order_id, opened_by, reason, note, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(opened_by)
        .bind(&request.reason)
        .bind(&request.note)
        .bind(DisputeStatus::Open)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for staff_id in self.users.staff_ids_tx(&mut tx).await? {
            self.notifications
                .enqueue_tx(
                    &mut tx,
                    staff_id,
                    "Dispute opened",
                    &format!("Order {} is under dispute: {}", order.id, dispute.reason),
                    Some(format!("/disputes/{}", dispute.id)),
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            dispute_id = %dispute.id,
            order_id = %order.id,
            "dispute opened, escrow frozen"
        );

        Ok(dispute)
    }

    /// Resolve an open dispute and route the escrowed funds. Staff only.
    pub async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        resolved_by: Uuid,
        request: ResolveDisputeRequest,
    ) -> CoreResult<Dispute> {
        // Role check runs before the transaction so it cannot starve the
        // single writer connection.
        self.users.require_staff(resolved_by).await?;

        let mut tx = self.db_pool.begin().await?;

        let dispute = self.fetch_dispute_tx(&mut tx, dispute_id).await?;
        if dispute.status != DisputeStatus::Open {
            return Err(CoreError::InvalidState(
                "dispute is already resolved".to_string(),
            ));
        }

        let order = self.orders.fetch_order_tx(&mut tx, dispute.order_id).await?;

        // Split validation happens before any ledger movement
        let (buyer_amount, seller_amount) = split_amounts(&request, &order)?;
        let meta = resolution_meta(&request, buyer_amount, seller_amount);

        let now = Utc::now();
        let dispute = sqlx::query_as::<_, Dispute>(
            r#"
            UPDATE disputes
            SET status = ?1, resolution = ?2, resolved_by = ?3, resolved_at = ?4, meta = ?5
            WHERE id = ?6 AND status = ?7
            RETURNING *
            "#,
        )
        .bind(DisputeStatus::Resolved)
        .bind(request.resolution)
        .bind(resolved_by)
        .bind(now)
        .bind(meta.map(Json))
        .bind(dispute_id)
        .bind(DisputeStatus::Open)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CoreError::InvalidState(
            "dispute is already resolved".to_string(),
        ))?;

        let ledger_meta = TxMeta::DisputeResolution {
            dispute_id: dispute.id,
            order_id: order.id,
            buyer_amount,
            seller_amount,
        };

        if buyer_amount > 0 {
            self.wallets
                .refund_tx(
                    &mut tx,
                    order.buyer_id,
                    buyer_amount,
                    Some(order.id),
                    Some(ledger_meta.clone()),
                )
                .await?;
        }
        if seller_amount > 0 {
            self.wallets
                .release_tx(
                    &mut tx,
                    order.buyer_id,
                    order.seller_id,
                    seller_amount,
                    Some(order.id),
                    Some(ledger_meta.clone()),
                )
                .await?;
        }

        let order = match request.resolution {
            DisputeResolution::RefundBuyer => {
                self.orders.refund_disputed_tx(&mut tx, order.id, now).await?
            }
            DisputeResolution::ReleaseSeller | DisputeResolution::Partial => {
                self.orders.settle_disputed_tx(&mut tx, order.id, now).await?
            }
        };

        self.orders.lock_conversation_tx(&mut tx, order.id).await?;

        self.notify_outcome(&mut tx, &order, buyer_amount, seller_amount)
            .await?;

        tx.commit().await?;

        tracing::info!(
            dispute_id = %dispute.id,
            order_id = %order.id,
            buyer_amount,
            seller_amount,
            "dispute resolved"
        );

        Ok(dispute)
    }

    /// Get a dispute by ID
    pub async fn get_dispute(&self, id: Uuid) -> CoreResult<Dispute> {
        let dispute = sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or(CoreError::NotFound("dispute not found".to_string()))?;

        Ok(dispute)
    }

    async fn fetch_dispute_tx(
        &self,
        conn: &mut SqliteConnection,
        id: Uuid,
    ) -> CoreResult<Dispute> {
        let dispute = sqlx::query_as::<_, Dispute>("SELECT * FROM disputes WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or(CoreError::NotFound("dispute not found".to_string()))?;

        Ok(dispute)
    }

    async fn notify_outcome(
        &self,
        conn: &mut SqliteConnection,
        order: &Order,
        buyer_amount: i64,
        seller_amount: i64,
    ) -> CoreResult<()> {
        let link = format!("/orders/{}", order.id);

        let buyer_body = if buyer_amount > 0 {
            format!("The dispute was resolved; {} was refunded to your wallet", buyer_amount)
        } else {
            "The dispute was resolved in the seller's favor".to_string()
        };
        self.notifications
            .enqueue_tx(conn, order.buyer_id, "Dispute resolved", &buyer_body, Some(link.clone()))
            .await?;

        let seller_body = if seller_amount > 0 {
            format!("The dispute was resolved; {} was released to your wallet", seller_amount)
        } else {
            "The dispute was resolved in the buyer's favor".to_string()
        };
        self.notifications
            .enqueue_tx(conn, order.seller_id, "Dispute resolved", &seller_body, Some(link))
            .await?;

        Ok(())
    }
}

/// Work out the buyer/seller payout for a resolution request.
///
/// PARTIAL requires an explicit buyer amount strictly between zero and the
/// order amount; there is no implicit default split.
fn split_amounts(request: &ResolveDisputeRequest, order: &Order) -> CoreResult<(i64, i64)> {
    match request.resolution {
        DisputeResolution::RefundBuyer => Ok((order.amount, 0)),
        DisputeResolution::ReleaseSeller => Ok((0, order.amount)),
        DisputeResolution::Partial => {
            let buyer_amount = request.buyer_amount.ok_or(CoreError::Validation(
                "partial resolution requires buyer_amount".to_string(),
            ))?;
            if buyer_amount <= 0 || buyer_amount >= order.amount {
                return Err(CoreError::Validation(format!(
                    "buyer_amount must be strictly between 0 and {}",
                    order.amount
                )));
            }
            Ok((buyer_amount, order.amount - buyer_amount))
        }
    }
}

/// Meta blob persisted on the resolved dispute row.
///
/// A PARTIAL resolution always records the exact split, whether or not the
/// resolver supplied context; the validated amounts win over caller keys of
/// the same name. Full resolutions store the caller context as given.
fn resolution_meta(
    request: &ResolveDisputeRequest,
    buyer_amount: i64,
    seller_amount: i64,
) -> Option<serde_json::Value> {
    match request.resolution {
        DisputeResolution::Partial => {
            let mut map = match request.meta.clone() {
                Some(serde_json::Value::Object(map)) => map,
                Some(other) => {
                    let mut map = serde_json::Map::new();
                    map.insert("context".to_string(), other);
                    map
                }
                None => serde_json::Map::new(),
            };
            map.insert("buyer_amount".to_string(), buyer_amount.into());
            map.insert("seller_amount".to_string(), seller_amount.into());
            Some(serde_json::Value::Object(map))
        }
        DisputeResolution::RefundBuyer | DisputeResolution::ReleaseSeller => request.meta.clone(),
    }
}
