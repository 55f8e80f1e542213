// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon HTTP server
//!
//! Serves the coordination API and the WebSocket subscriber endpoint until
//! Ctrl+C or SIGTERM, then drains the audit queue before exiting.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use conclave_core::presentation::app;

use crate::embedded::{load_config, EmbeddedCoordinator};

pub async fn start_daemon(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let manifest = load_config(config_path)?;
    let addr = format!(
        "{}:{}",
        host.unwrap_or_else(|| manifest.spec.server.bind_address.clone()),
        port.unwrap_or(manifest.spec.server.port)
    );

    let coordinator = EmbeddedCoordinator::from_manifest(manifest).await?;
    info!(backend = %coordinator.facade.backend_kind(), "Storage backend selected");

    let router = app(coordinator.facade.clone());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Daemon listening on {}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    info!("Daemon shutting down, flushing audit trail");
    coordinator.shutdown().await;

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
