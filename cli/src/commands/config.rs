// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use conclave_core::domain::config::{CoordinatorConfigManifest, LoggingConfig};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective manifest as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./conclave-config.yaml)
        #[arg(short, long, default_value = "./conclave-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, force } => generate(output, force).await,
    }
}

/// Logging section of the effective configuration, or defaults if the
/// configuration cannot be loaded yet (the command will report that).
pub fn logging_settings(config_override: Option<PathBuf>) -> LoggingConfig {
    CoordinatorConfigManifest::load_or_default(config_override)
        .map(|manifest| manifest.spec.logging)
        .unwrap_or_default()
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let manifest = CoordinatorConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. CONCLAVE_CONFIG_PATH: {}",
            std::env::var("CONCLAVE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./conclave-config.yaml");
        println!("  4. ~/.conclave/config.yaml");
        println!("  5. /etc/conclave/config.yaml");
        println!();
    }

    if as_yaml {
        let yaml = serde_yaml::to_string(&manifest).context("Failed to render configuration")?;
        print!("{}", yaml);
        return Ok(());
    }

    let spec = &manifest.spec;
    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", spec.server.bind_address, spec.server.port);
    println!();

    println!("{}", "Storage:".bold());
    match &spec.storage.database_url {
        Some(url) => println!("  Database: {}", redact_password(url)),
        None => println!("  Database: {}", "(not set, file store only)".dimmed()),
    }
    println!("  Max connections: {}", spec.storage.max_connections);
    println!("  Data dir: {}", spec.storage.data_dir.display());
    println!();

    println!("{}", "Locks:".bold());
    println!("  Default TTL: {:?}", spec.locks.default_ttl);
    println!();

    println!("{}", "Audit:".bold());
    println!("  Logs dir: {}", spec.audit.logs_dir.display());
    println!("  Git commits: {}", spec.audit.git_commit);
    println!("  Author: {} <{}>", spec.audit.author_name, spec.audit.author_email);
    println!("  File queue capacity: {}", spec.audit.queue_capacity);
    println!();

    println!("{}", "Events:".bold());
    println!("  Channel capacity: {}", spec.events.channel_capacity);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let manifest = CoordinatorConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    manifest
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    CoordinatorConfigManifest::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

/// Hide the password component of a connection URL.
fn redact_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:****@{}", scheme, user, host),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_password() {
        assert_eq!(
            redact_password("postgres://conclave:secret@db:5432/conclave"),
            "postgres://conclave:****@db:5432/conclave"
        );
        assert_eq!(redact_password("postgres://db/conclave"), "postgres://db/conclave");
        assert_eq!(redact_password("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("conclave-config.yaml");

        generate(output.clone(), false).await.unwrap();
        assert!(generate(output.clone(), false).await.is_err());
        generate(output.clone(), true).await.unwrap();

        let manifest = CoordinatorConfigManifest::from_yaml_file(&output).unwrap();
        manifest.validate().unwrap();
    }
}
