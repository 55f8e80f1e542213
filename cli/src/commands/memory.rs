// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Memory commands (embedded mode)
//!
//! Commands: get, put, delete, list, audit

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use conclave_core::MemoryValue;

use crate::embedded::EmbeddedCoordinator;

#[derive(Subcommand)]
pub enum MemoryCommand {
    /// Read one record
    Get {
        namespace: String,
        key: String,
    },

    /// Write one record (JSON values are stored structured, anything else as text)
    Put {
        namespace: String,
        key: String,
        value: String,

        /// Store the value as text even if it parses as JSON
        #[arg(long)]
        text: bool,

        /// Actor recorded in the audit trail
        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Delete one record
    Delete {
        namespace: String,
        key: String,

        /// Actor recorded in the audit trail
        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// List keys in a namespace
    List {
        namespace: String,

        /// Only keys starting with this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Show recent audit entries for a namespace
    Audit {
        namespace: String,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

pub async fn handle_command(command: MemoryCommand, config_path: Option<PathBuf>) -> Result<()> {
    let coordinator = EmbeddedCoordinator::new(config_path).await?;
    let result = run(&coordinator, command).await;
    coordinator.shutdown().await;
    result
}

/// Parse a command-line value. Valid JSON other than a bare string is
/// structured; everything else is text.
pub fn parse_value(raw: &str, force_text: bool) -> MemoryValue {
    if force_text {
        return MemoryValue::Text(raw.to_string());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => MemoryValue::from_wire(value),
        Err(_) => MemoryValue::Text(raw.to_string()),
    }
}

async fn run(coordinator: &EmbeddedCoordinator, command: MemoryCommand) -> Result<()> {
    let facade = &coordinator.facade;

    match command {
        MemoryCommand::Get { namespace, key } => {
            match facade.read(&namespace, &key).await? {
                Some(record) => {
                    let rendered = match &record.value {
                        MemoryValue::Text(text) => text.clone(),
                        MemoryValue::Structured(value) => serde_json::to_string_pretty(value)
                            .context("Failed to render value")?,
                    };
                    println!("{}", rendered);
                    eprintln!(
                        "{}",
                        format!(
                            "{} | updated {}",
                            record.content_type,
                            record.updated_at.to_rfc3339()
                        )
                        .dimmed()
                    );
                }
                None => anyhow::bail!("{}/{} not found", namespace, key),
            }
        }
        MemoryCommand::Put {
            namespace,
            key,
            value,
            text,
            actor,
        } => {
            let value = parse_value(&value, text);
            let record = facade.write(&namespace, &key, value, &actor).await?;
            println!(
                "{}",
                format!("✓ Stored {}/{} ({})", namespace, key, record.content_type).green()
            );
        }
        MemoryCommand::Delete {
            namespace,
            key,
            actor,
        } => {
            if facade.delete(&namespace, &key, &actor).await? {
                println!("{}", format!("✓ Deleted {}/{}", namespace, key).green());
            } else {
                println!("{}", format!("{}/{} did not exist", namespace, key).yellow());
            }
        }
        MemoryCommand::List { namespace, prefix } => {
            let mut keys = facade.list(&namespace, &prefix).await?;
            keys.sort();
            for key in &keys {
                println!("{}", key);
            }
            eprintln!("{}", format!("{} key(s)", keys.len()).dimmed());
        }
        MemoryCommand::Audit { namespace, limit } => {
            let entries = facade.recent_audit(Some(&namespace), limit).await?;
            if entries.is_empty() {
                println!("{}", "No audit entries".dimmed());
            }
            for entry in entries {
                println!(
                    "{:>6}  {}  {:<6}  {:<24}  {}  {}",
                    entry.sequence,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.operation.to_string().bold(),
                    entry.key,
                    entry.actor.cyan(),
                    entry.preview.dimmed()
                );
            }
        }
    }

    Ok(())
}
