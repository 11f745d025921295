//! # userlookup-server
//!
//! Entry point: reads configuration from the environment, then serves `/user` until SIGINT or
//! SIGTERM.

#![forbid(unsafe_code)]

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use userlookup_core::ServiceConfig;
use userlookup_ldap::DirectoryClient;
use userlookup_server::logging::{init_logging, LogFormat, LOG_FORMAT_KEY};
use userlookup_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let format = LogFormat::from_value(std::env::var(LOG_FORMAT_KEY).ok().as_deref());
    init_logging("info", format)?;

    let config = Arc::new(ServiceConfig::from_lookup(|key| std::env::var(key).ok())?);
    let directory = DirectoryClient::new(config.clone())?;

    let shutdown = CancellationToken::new();
    let state = AppState::new(config.clone(), directory, shutdown.clone());

    let listener = TcpListener::bind(config.listen_address()).await?;
    info!(
        listen_address = %config.listen_address(),
        ldap_url = config.ldap_url(),
        "Server started"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM and cancels in-flight directory operations.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }

    shutdown.cancel();
}
