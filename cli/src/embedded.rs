// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Embedded mode execution
//!
//! Builds the coordination stack in-process from configuration so one-shot
//! commands operate on the same storage the daemon uses.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::warn;

use conclave_core::application::CoordinationFacade;
use conclave_core::domain::config::CoordinatorConfigManifest;

pub struct EmbeddedCoordinator {
    pub manifest: CoordinatorConfigManifest,
    pub facade: CoordinationFacade,
    audit_worker: JoinHandle<()>,
}

/// Load (with environment overrides) and validate configuration.
pub fn load_config(config_path: Option<PathBuf>) -> Result<CoordinatorConfigManifest> {
    let manifest = CoordinatorConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    manifest
        .validate()
        .context("Configuration validation failed")?;
    Ok(manifest)
}

impl EmbeddedCoordinator {
    pub async fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let manifest = load_config(config_path)?;
        Self::from_manifest(manifest).await
    }

    pub async fn from_manifest(manifest: CoordinatorConfigManifest) -> Result<Self> {
        let (facade, audit_worker) = CoordinationFacade::from_config(&manifest.spec)
            .await
            .context("Failed to initialize storage backend")?;

        Ok(Self {
            manifest,
            facade,
            audit_worker,
        })
    }

    /// Drain the audit queue, then stop the worker.
    pub async fn shutdown(self) {
        if let Err(e) = self.facade.flush_audit().await {
            warn!("Audit flush failed during shutdown: {}", e);
        }
        self.audit_worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::MemoryValue;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_embedded_write_survives_restart() {
        let dir = TempDir::new().unwrap();
        let mut manifest = CoordinatorConfigManifest::default();
        manifest.spec.storage.database_url = None;
        manifest.spec.storage.data_dir = dir.path().join("data");
        manifest.spec.audit.logs_dir = dir.path().join("logs");
        manifest.spec.audit.git_commit = false;

        let first = EmbeddedCoordinator::from_manifest(manifest.clone()).await.unwrap();
        first.facade.write("ns", "k", "v".into(), "cli").await.unwrap();
        first.shutdown().await;

        let second = EmbeddedCoordinator::from_manifest(manifest).await.unwrap();
        let record = second.facade.read("ns", "k").await.unwrap().unwrap();
        assert_eq!(record.value, MemoryValue::Text("v".into()));
        second.shutdown().await;
    }
}
