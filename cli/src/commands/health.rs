// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Health snapshot (embedded mode)

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::embedded::EmbeddedCoordinator;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let coordinator = EmbeddedCoordinator::new(config_path).await?;
    let report = coordinator.facade.health().await;
    coordinator.shutdown().await;

    let status = if report.connected {
        "connected".green()
    } else {
        "disconnected".red()
    };
    println!("{}", "Conclave health:".bold());
    println!("  Backend: {} ({})", report.backend, status);
    println!("  Records: {}", report.stats.total_records);
    for (namespace, count) in &report.stats.namespaces {
        println!("    {}: {}", namespace, count);
    }
    println!("  Active locks: {}", report.active_locks);

    Ok(())
}
