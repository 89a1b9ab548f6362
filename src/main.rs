//! Platformer relay server
//!
//! Entry point for the relay. It handles:
//! - WebSocket connections carrying player lifecycle and position events
//! - Static asset hosting for the browser client
//! - Health reporting

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use platformer_relay::app::AppState;
use platformer_relay::config::Config;
use platformer_relay::http::build_router;
use platformer_relay::relay::RelayHub;
use platformer_relay::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level)?;

    // Initialize server time tracking
    init_server_time();

    info!("Starting platformer relay");
    info!("Server address: {}", config.server_addr);
    info!("Allowed origins: {}", config.client_origin);
    if config.strict_ids {
        info!("Strict ids enabled: relayed positions carry the sender's id");
    }
    if !config.static_dir.is_dir() {
        warn!(dir = %config.static_dir.display(), "Static asset directory not found");
    }

    // Create application state
    let state = AppState::new(config.clone());
    let relay = state.relay.clone();

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(relay))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over `LOG_LEVEL` when both are set
fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A signal that cannot be hooked is logged
/// and never fires, leaving the other one in charge.
async fn shutdown_signal(relay: Arc<RelayHub>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let reason = tokio::select! {
        _ = ctrl_c => "ctrl-c",
        _ = terminate => "sigterm",
    };

    let stats = relay.stats();
    info!(
        reason,
        connections = stats.connections,
        roster_size = stats.roster_size,
        "Shutting down relay"
    );
}
