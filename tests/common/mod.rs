//! Shared test fixtures: throwaway databases and seed data helpers
#![allow(dead_code)]

use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use pazar_core::config::{Config, Environment};
use pazar_core::db::{create_pool, run_migrations};
use pazar_core::listings::{CreateListingRequest, Listing};
use pazar_core::orders::TradeConversation;
use pazar_core::state::AppState;
use pazar_core::users::{CreateUserRequest, User, UserRole};
use pazar_core::wallet::DepositRequest;

/// Config pointing at the given database URL, with test-friendly defaults
pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        environment: Environment::Development,
        port: 3001,
        db_max_connections: 1,
        auto_release_hours: 72,
        sweep_interval_secs: 60,
        notify_poll_secs: 5,
        notify_webhook_url: None,
        cors_allowed_origins: None,
        log_level: "info".to_string(),
    }
}

/// Create a migrated pool over a temp-dir database file.
///
/// The `TempDir` must be kept alive alongside the pool; dropping it deletes
/// the database file.
pub async fn setup_test_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("escrow_test.db");
    let config = test_config(&format!("sqlite://{}", db_path.display()));

    let pool = create_pool(&config)
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool).await.expect("Failed to run migrations");

    (pool, dir)
}

/// Full application state wired over a fresh throwaway database
pub async fn setup_state() -> (AppState, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("escrow_test.db");
    let config = test_config(&format!("sqlite://{}", db_path.display()));

    let pool = create_pool(&config)
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool).await.expect("Failed to run migrations");

    (AppState::from_pool(pool, &config), dir)
}

/// Insert a user with the given role
pub async fn seed_user(state: &AppState, username: &str, role: UserRole) -> User {
    state
        .users
        .create_user(CreateUserRequest {
            username: username.to_string(),
            role: Some(role),
        })
        .await
        .expect("Failed to create user")
}

/// Insert an active listing owned by the seller
pub async fn seed_listing(state: &AppState, seller_id: Uuid, title: &str, price: i64) -> Listing {
    state
        .listings
        .create_listing(CreateListingRequest {
            seller_id,
            title: title.to_string(),
            price,
        })
        .await
        .expect("Failed to create listing")
}

/// Credit a user's available balance through the normal deposit path
pub async fn fund_wallet(state: &AppState, user_id: Uuid, amount: i64) {
    state
        .wallets
        .deposit(
            user_id,
            DepositRequest {
                amount,
                provider: Some("test".to_string()),
                reference_id: None,
            },
        )
        .await
        .expect("Failed to fund wallet");
}

/// Rewind an order's auto-release deadline one hour into the past
pub async fn backdate_auto_release(state: &AppState, order_id: Uuid) {
    sqlx::query("UPDATE marketplace_orders SET auto_release_at = ?1 WHERE id = ?2")
        .bind(chrono::Utc::now() - chrono::Duration::hours(1))
        .bind(order_id)
        .execute(state.db.pool())
        .await
        .expect("Failed to backdate order");
}

/// Sum of both balance buckets across every wallet.
///
/// Internal moves (hold, release, refund) must never change this; only
/// deposits and withdrawals may.
pub async fn total_in_system(state: &AppState) -> i64 {
    let (total,): (i64,) =
        sqlx::query_as("SELECT COALESCE(SUM(balance_available + balance_held), 0) FROM wallets")
            .fetch_one(state.db.pool())
            .await
            .expect("Failed to sum wallet balances");

    total
}

/// Count ledger rows for a user, optionally narrowed to one entry type
pub async fn ledger_count(state: &AppState, user_id: Uuid, tx_type: Option<&str>) -> i64 {
    let (count,): (i64,) = match tx_type {
        Some(tx_type) => sqlx::query_as(
            "SELECT COUNT(*) FROM wallet_transactions WHERE user_id = ?1 AND tx_type = ?2",
        )
        .bind(user_id)
        .bind(tx_type)
        .fetch_one(state.db.pool())
        .await
        .expect("Failed to count ledger rows"),
        None => sqlx::query_as("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(state.db.pool())
            .await
            .expect("Failed to count ledger rows"),
    };

    count
}

/// Count notification outbox rows addressed to a user
pub async fn notification_count(state: &AppState, user_id: Uuid) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(state.db.pool())
            .await
            .expect("Failed to count notifications");

    count
}

/// Whether the order's trade conversation is locked
pub async fn conversation_locked(state: &AppState, order_id: Uuid) -> bool {
    let conversation = sqlx::query_as::<_, TradeConversation>(
        "SELECT * FROM trade_conversations WHERE order_id = ?1",
    )
    .bind(order_id)
    .fetch_one(state.db.pool())
    .await
    .expect("Failed to fetch conversation");

    conversation.is_locked
}
