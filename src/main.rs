//! Pazar escrow core server
//!
//! Hosts the wallet ledger, order escrow, and dispute resolution services
//! behind an HTTP facade, with background jobs for escrow auto-release and
//! notification delivery.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use pazar_core::config::Config;
use pazar_core::db;
use pazar_core::middleware::request_tracing;
use pazar_core::notifications::run_notification_dispatcher;
use pazar_core::orders::run_auto_release_sweeper;
use pazar_core::routes::api_router;
use pazar_core::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        database = %config.database_url_masked(),
        auto_release_hours = config.auto_release_hours,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let state = AppState::from_pool(pool, &config);

    // Background jobs: overdue escrow release and outbox delivery
    tokio::spawn(run_auto_release_sweeper(
        state.orders.clone(),
        config.sweep_interval_secs,
    ));
    tokio::spawn(run_notification_dispatcher(
        state.notifications.clone(),
        config.notify_poll_secs,
    ));

    let app = api_router()
        .with_state(state)
        .layer(axum::middleware::from_fn(request_tracing))
        .layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let origins_str = config.cors_allowed_origins.clone().unwrap_or_default();

    if origins_str.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
