//! Notification outbox service and background dispatcher

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::notifications::Notification;

/// Rows failing this many deliveries are left in the outbox and skipped
const MAX_DELIVERY_ATTEMPTS: i64 = 5;

/// How many outbox rows one dispatcher pass picks up
const DISPATCH_BATCH_SIZE: i64 = 50;

#[derive(Clone)]
pub struct NotificationService {
    db_pool: SqlitePool,
    webhook_url: Option<String>,
    http: reqwest::Client,
}

impl NotificationService {
    pub fn new(db_pool: SqlitePool, webhook_url: Option<String>) -> Self {
        Self {
            db_pool,
            webhook_url,
            http: reqwest::Client::new(),
        }
    }

    /// Enqueue a notification inside the caller's open transaction
    pub async fn enqueue_tx(
        &self,
        conn: &mut SqliteConnection,
        user_id: Uuid,
        title: &str,
        body: &str,
        link: Option<String>,
    ) -> CoreResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, title, body, link, attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(link)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(notification)
    }

    /// Undelivered rows still within the attempt budget, oldest first
    pub async fn pending(&self, limit: i64) -> CoreResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE dispatched_at IS NULL AND attempts < ?1
            ORDER BY created_at ASC
            LIMIT ?2
            "#,
        )
        .bind(MAX_DELIVERY_ATTEMPTS)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows)
    }

    /// Deliver pending notifications, returning how many went out
    pub async fn dispatch_pending(&self) -> CoreResult<usize> {
        let pending = self.pending(DISPATCH_BATCH_SIZE).await?;
        let mut delivered = 0;

        for notification in pending {
            match self.deliver(&notification).await {
                Ok(()) => {
                    self.mark_dispatched(notification.id).await?;
                    delivered += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        notification_id = %notification.id,
                        attempts = notification.attempts + 1,
                        error = %e,
                        "notification delivery failed"
                    );
                    self.record_failure(notification.id).await?;
                }
            }
        }

        Ok(delivered)
    }

    /// Deliver one notification: always logged, POSTed when a webhook is set
    async fn deliver(&self, notification: &Notification) -> Result<(), reqwest::Error> {
        tracing::info!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            title = %notification.title,
            "notification"
        );

        if let Some(url) = &self.webhook_url {
            self.http
                .post(url)
                .json(notification)
                .send()
                .await?
                .error_for_status()?;
        }

        Ok(())
    }

    async fn mark_dispatched(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("UPDATE notifications SET dispatched_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    async fn record_failure(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("UPDATE notifications SET attempts = attempts + 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }
}

/// Background job delivering outbox rows until the process shuts down
pub async fn run_notification_dispatcher(service: Arc<NotificationService>, poll_secs: u64) {
    tracing::info!(poll_secs, "starting notification dispatcher");

    loop {
        tokio::time::sleep(Duration::from_secs(poll_secs)).await;

        match service.dispatch_pending().await {
            Ok(0) => {}
            Ok(count) => {
                tracing::debug!(count, "dispatched notifications");
            }
            Err(e) => {
                tracing::error!(error = %e, "error dispatching notifications");
            }
        }
    }
}
