//! BetVex Relayer - relays subscriber bets through the proxy contract
//!
//! Loads configuration, opens the relayer session against the NEAR RPC
//! endpoint and serves bet relay requests over HTTP.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use betvex_relayer::api;
use betvex_relayer::chain::{LedgerRpc, NearRpcClient};
use betvex_relayer::config::Settings;
use betvex_relayer::metrics::{self, MetricsServer};
use betvex_relayer::tx::Session;
use betvex_relayer::RelayEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting BetVex Relayer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Loaded configuration: relayer {} on {} via {}",
        settings.relayer.account_id, settings.network.network_id, settings.network.rpc_url
    );

    // Missing key material is fatal
    let private_key = settings.wallet.private_key()?;

    let client = NearRpcClient::new(&settings.network)?;
    info!("RPC provider ready for {}", client.network_id());
    let rpc: Arc<dyn LedgerRpc> = Arc::new(client);
    let session = Arc::new(
        Session::open(
            &settings.relayer.account_id,
            &private_key,
            &settings.network.network_id,
            rpc.clone(),
        )
        .context("failed to open relayer session")?,
    );
    drop(private_key);

    match rpc.status().await {
        Ok(status) => info!(
            "Connected to {} at block {}{}",
            status.chain_id,
            status.sync_info.latest_block_height,
            if status.sync_info.syncing { " (syncing)" } else { "" }
        ),
        Err(e) => warn!("RPC node not reachable at startup: {}", e),
    }

    let engine = Arc::new(RelayEngine::new(session, &settings.relayer)?);
    info!("Relay engine initialized");

    // Start API server
    let api_handle = if settings.api.enabled {
        let config = settings.api.clone();
        let engine = engine.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = api::run_server(config, engine).await {
                error!("API server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    // Health check loop
    let health_handle = tokio::spawn({
        let engine = engine.clone();
        let interval = settings.health.interval_secs.max(1);
        async move {
            loop {
                tokio::time::sleep(Duration::from_secs(interval)).await;

                match engine.rpc().status().await {
                    Ok(status) if !status.sync_info.syncing => {
                        metrics::record_rpc_health(true);
                        metrics::record_health_check();
                    }
                    Ok(status) => {
                        warn!(
                            "RPC node is syncing (block {})",
                            status.sync_info.latest_block_height
                        );
                        metrics::record_rpc_health(false);
                        metrics::record_health_check_failure();
                    }
                    Err(e) => {
                        warn!("RPC health check failed: {}", e);
                        metrics::record_rpc_health(false);
                        metrics::record_health_check_failure();
                    }
                }

                engine.cleanup();
            }
        }
    });

    info!("BetVex Relayer is running");
    if settings.api.enabled {
        info!("API server: http://{}:{}", settings.api.host, settings.api.port);
    }
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    // Abort background tasks
    health_handle.abort();
    if let Some(h) = api_handle {
        h.abort();
    }
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("BetVex Relayer stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,betvex_relayer=debug,hyper=warn,reqwest=warn")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
