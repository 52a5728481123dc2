//! Background job releasing overdue escrows
//!
//! The lazy on-read path already settles overdue orders; this sweep catches
//! orders nobody is looking at. Both paths go through the same idempotent
//! operation, so running them together is safe.

use std::sync::Arc;
use std::time::Duration;

use super::OrderService;

/// Orders picked up per sweep pass
const SWEEP_BATCH_SIZE: i64 = 100;

/// Periodically release every due escrow until the process shuts down
pub async fn run_auto_release_sweeper(orders: Arc<OrderService>, interval_secs: u64) {
    tracing::info!(interval_secs, "starting auto-release sweeper");

    loop {
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;

        let due = match orders.due_order_ids(SWEEP_BATCH_SIZE).await {
            Ok(due) => due,
            Err(e) => {
                tracing::error!(error = %e, "error scanning for due escrows");
                continue;
            }
        };

        for order_id in due {
            match orders.auto_release_order(order_id).await {
                Ok(Some(order)) => {
                    tracing::info!(order_id = %order.id, "sweeper released escrow");
                }
                // Raced with a buyer confirmation or a fresh dispute
                Ok(None) => {
                    tracing::debug!(order_id = %order_id, "sweeper skipped order");
                }
                Err(e) => {
                    tracing::error!(order_id = %order_id, error = %e, "auto-release failed");
                }
            }
        }
    }
}
