//! AIS monitor server

use std::sync::Arc;

use ais_monitor::api::{build_router, AppState};
use ais_monitor::config::AppConfig;
use ais_monitor::database::Database;
use ais_monitor::errors::MonitorError;
use ais_monitor::resolver::FallbackRegistry;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    #[cfg(feature = "dotenv")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let database = Database::connect(&config.database).await?;

    let fallback = match &config.fallback.path {
        Some(path) => FallbackRegistry::load(path)?,
        None => FallbackRegistry::default(),
    };
    if fallback.is_empty() {
        info!("No fallback vessel records, unknown vessels resolve to placeholders");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(
        Arc::new(database),
        Arc::new(fallback),
        config.stream.clone(),
        shutdown_rx,
    )?;
    let router = build_router(Arc::new(state), config.server.static_dir.as_deref());

    let address = config.server.address()?;
    let listener = TcpListener::bind(address).await?;
    info!("AIS monitor listening on {}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Received shutdown signal");
            // Ends open streams so the server can drain
            let _ = shutdown_tx.send(true);
        })
        .await?;

    info!("AIS monitor stopped");
    Ok(())
}
