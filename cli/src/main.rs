// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Conclave CLI
//!
//! The `conclave` binary runs the coordination memory store daemon and
//! offers one-shot commands against the same storage.
//!
//! ## Commands
//!
//! - `conclave serve` - Run the HTTP + WebSocket daemon
//! - `conclave memory get|put|delete|list|audit` - Embedded memory operations
//! - `conclave config show|validate|generate` - Configuration management
//! - `conclave health` - Embedded health snapshot

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use conclave_cli::commands::{self, ConfigCommand, MemoryCommand};
use conclave_cli::daemon;

/// Conclave - coordination memory for cooperating agents
#[derive(Parser)]
#[command(name = "conclave")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CONCLAVE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CONCLAVE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log output format (text, json)
    #[arg(long, global = true, env = "CONCLAVE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the coordination daemon
    #[command(name = "serve")]
    Serve {
        /// HTTP bind address (overrides config)
        #[arg(long, env = "CONCLAVE_HOST")]
        host: Option<String>,

        /// HTTP port (overrides config)
        #[arg(long, env = "CONCLAVE_PORT")]
        port: Option<u16>,
    },

    /// Namespaced memory operations
    #[command(name = "memory")]
    Memory {
        #[command(subcommand)]
        command: MemoryCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Show backend and lease status
    #[command(name = "health")]
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let logging = commands::config::logging_settings(cli.config.clone());
    init_logging(
        cli.log_level.as_deref().unwrap_or(&logging.level),
        cli.log_format.as_deref().unwrap_or(&logging.format),
    )?;

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            info!("Starting Conclave daemon");
            daemon::start_daemon(cli.config, host, port).await
        }
        Some(Commands::Memory { command }) => {
            commands::memory::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Health) => commands::health::execute(cli.config).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        "json" => builder.json().init(),
        _ => builder.with_target(false).compact().init(),
    }

    Ok(())
}
