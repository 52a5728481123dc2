//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::Database;
use crate::disputes::DisputeService;
use crate::listings::ListingService;
use crate::notifications::NotificationService;
use crate::orders::OrderService;
use crate::users::UserService;
use crate::wallet::WalletService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub users: Arc<UserService>,
    pub listings: Arc<ListingService>,
    pub wallets: Arc<WalletService>,
    pub orders: Arc<OrderService>,
    pub disputes: Arc<DisputeService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    /// Wire up every service over one pool. Used by the server binary and
    /// the integration tests alike.
    pub fn from_pool(pool: SqlitePool, config: &Config) -> Self {
        let db = Database::new(pool.clone());
        let users = UserService::new(pool.clone());
        let listings = ListingService::new(pool.clone());
        let wallets = WalletService::new(pool.clone());
        let notifications =
            NotificationService::new(pool.clone(), config.notify_webhook_url.clone());

        let orders = Arc::new(OrderService::new(
            pool.clone(),
            wallets.clone(),
            listings.clone(),
            users.clone(),
            notifications.clone(),
            config.auto_release_window(),
        ));

        let disputes = Arc::new(DisputeService::new(
            pool,
            wallets.clone(),
            users.clone(),
            orders.clone(),
            notifications.clone(),
        ));

        Self {
            config: Arc::new(config.clone()),
            db,
            users: Arc::new(users),
            listings: Arc::new(listings),
            wallets: Arc::new(wallets),
            orders,
            disputes,
            notifications: Arc::new(notifications),
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for Arc<UserService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.users.clone()
    }
}

impl FromRef<AppState> for Arc<ListingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.listings.clone()
    }
}

impl FromRef<AppState> for Arc<WalletService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.wallets.clone()
    }
}

impl FromRef<AppState> for Arc<OrderService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.orders.clone()
    }
}

impl FromRef<AppState> for Arc<DisputeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.disputes.clone()
    }
}

impl FromRef<AppState> for Arc<NotificationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.notifications.clone()
    }
}
