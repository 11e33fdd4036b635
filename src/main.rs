//! wallet-pulse - real-time wallet activity and daily PnL tracker
//!
//! This is the service entry point. It wires the store, chain client, token
//! registry, monitor, PnL aggregator, and push hub together and manages
//! shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_pulse::chain::{ChainClient, RpcChainClient};
use wallet_pulse::clock::{Clock, SystemClock};
use wallet_pulse::config::AppConfig;
use wallet_pulse::events::event_bus;
use wallet_pulse::hub::{self, Hub};
use wallet_pulse::monitor::Monitor;
use wallet_pulse::pnl::DailyPnlTracker;
use wallet_pulse::store::{PgStore, Store};
use wallet_pulse::token::TokenRegistry;
use wallet_pulse::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting wallet-pulse v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    tracing::info!(
        port = config.port,
        ws_port = config.ws_port,
        "Configuration loaded"
    );

    // Database
    let pool = db::init_pool(&config.database_url, &config.database).await?;
    db::run_migrations(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(
        &config.solana_rpc_url,
        config.rpc.timeout_secs,
        config.rpc.rate_limit_per_second,
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Token registry, primed from the database
    let registry = Arc::new(TokenRegistry::new(store.clone(), chain.clone()));
    let cached = registry.load_all().await?;
    tracing::info!(tokens = cached, "Token registry primed");

    // Event bus and pipeline
    let events = event_bus(256);
    let pnl = Arc::new(DailyPnlTracker::new(
        store.clone(),
        clock.clone(),
        events.clone(),
    ));
    let monitor = Arc::new(Monitor::new(
        store.clone(),
        chain.clone(),
        clock.clone(),
        pnl.clone(),
        events.clone(),
        config.monitor.clone(),
    ));
    monitor.initialize().await?;

    let cancel = CancellationToken::new();

    // Push hub subscribes before the monitor starts so no event is missed
    let hub = Arc::new(Hub::new(store.clone(), registry.clone(), clock.clone()));
    let hub_task = tokio::spawn(hub.clone().run(monitor.subscribe(), cancel.clone()));
    let monitor_task = monitor.clone().start(cancel.clone());

    // WebSocket listener
    let ws_app = hub::router(hub.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let ws_addr = SocketAddr::from(([0, 0, 0, 0], config.ws_port));
    let ws_listener = tokio::net::TcpListener::bind(ws_addr).await?;
    tracing::info!(%ws_addr, "Push hub listening");

    let ws_cancel = cancel.clone();
    let ws_server = tokio::spawn(async move {
        axum::serve(ws_listener, ws_app)
            .with_graceful_shutdown(async move { ws_cancel.cancelled().await })
            .await
    });

    // Plain health endpoint for load balancers
    let health_app = axum::Router::new().route("/health", axum::routing::get(health));
    let health_addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let health_listener = tokio::net::TcpListener::bind(health_addr).await?;
    tracing::info!(%health_addr, "Health endpoint listening");

    let health_cancel = cancel.clone();
    let health_server = tokio::spawn(async move {
        axum::serve(health_listener, health_app)
            .with_graceful_shutdown(async move { health_cancel.cancelled().await })
            .await
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    let _ = monitor_task.await;
    let _ = hub_task.await;
    let _ = ws_server.await;
    let _ = health_server.await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_pulse=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}
