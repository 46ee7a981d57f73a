//! Queueline - Main Entry Point
//! SQLite document store + queue engine + JSON-RPC server

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// Import workspace crates
use queueline_api_rpc::{RpcServer, RpcServerConfig};
use queueline_core::application::command::DEFAULT_COMMAND_CAPACITY;
use queueline_core::application::{
    command_channel, shutdown_channel, DocumentRoster, FeedSync, QueueController,
};
use queueline_core::domain::FeedKey;
use queueline_core::port::id_provider::UuidProvider;
use queueline_core::port::time_provider::SystemTimeProvider;
use queueline_core::port::{DocumentStore, IdProvider, RosterStore, TimeProvider};
use queueline_infra_sqlite::{create_pool, run_migrations, SqliteDocumentStore};

use crate::config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration, then logging
    let config = DaemonConfig::load()?;
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;

    info!("Queueline v{} starting...", VERSION);
    info!(
        database_url = %config.database_url,
        location_id = %config.location_id,
        region = %config.region,
        write_mode = ?config.write_mode,
        "Configuration loaded"
    );

    // 2. Database
    let pool = create_pool(&config.database_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. Dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);
    let store: Arc<dyn DocumentStore> =
        Arc::new(SqliteDocumentStore::new(pool.clone(), time_provider.clone()));
    let roster: Arc<dyn RosterStore> =
        Arc::new(DocumentRoster::new(store.clone(), id_provider.clone()));
    let sync = Arc::new(FeedSync::new(store, id_provider.clone(), config.write_mode));
    let controller = Arc::new(QueueController::new(
        sync,
        roster.clone(),
        id_provider,
        time_provider,
    ));

    // 4. Open the configured feed
    controller
        .open(FeedKey::new(&config.location_id, &config.region))
        .await
        .context("Failed to open feed")?;

    // 5. Engine command loop
    let (commands, command_loop) = command_channel(controller, DEFAULT_COMMAND_CAPACITY);
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let loop_handle = tokio::spawn(command_loop.run(shutdown_rx));

    // 6. JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, commands, roster, &config.location_id)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(addr = %addr, "System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown: stop accepting calls, then drain the engine
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    shutdown_tx.shutdown();
    match tokio::time::timeout(Duration::from_secs(5), loop_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Command loop ended abnormally"),
        Err(_) => warn!("Command loop did not stop within 5s"),
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
