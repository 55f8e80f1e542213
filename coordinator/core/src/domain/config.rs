// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Coordinator Configuration Types
//
// Defines the configuration schema for a Conclave coordinator, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - HTTP/WebSocket bind settings
// - Storage backend selection (PostgreSQL URL, fallback data directory)
// - Lease TTL defaults
// - Audit trail location and commit identity
// - Event fan-out buffer and logging settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::lock::DEFAULT_LOCK_TTL;
use crate::domain::repository::{FileConfig, PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "conclave/v1";
pub const KIND: &str = "CoordinatorConfig";

/// Top-level Kubernetes-style coordinator configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfigManifest {
    /// API version (must be "conclave/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CoordinatorConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: CoordinatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable coordinator name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Coordinator configuration specification (content under spec:)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub locks: LockConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// PostgreSQL connection string. When unset or unreachable the
    /// coordinator runs on the file store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Upper bound on pooled PostgreSQL connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Directory of the fallback file store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lease TTL when the caller does not pass one (e.g. "30s", "500ms")
    #[serde(default = "default_lock_ttl", with = "humantime_serde")]
    pub default_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Root of the per-(namespace, key) NDJSON files; also the git work tree
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Commit every appended entry to git
    #[serde(default = "default_true")]
    pub git_commit: bool,

    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_email")]
    pub author_email: String,

    /// Entries retained by the in-memory queryable log (file backend only)
    #[serde(default = "default_queryable_capacity")]
    pub queryable_capacity: usize,

    /// Entries waiting for the flat-file worker; further entries are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Per-subscriber buffer before slow subscribers start losing events
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8400
}

fn default_max_connections() -> u32 {
    5
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./.conclave/data")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("./.conclave/logs")
}

fn default_lock_ttl() -> Duration {
    DEFAULT_LOCK_TTL
}

fn default_author_name() -> String {
    "conclave".to_string()
}

fn default_author_email() -> String {
    "conclave@localhost".to_string()
}

fn default_queryable_capacity() -> usize {
    10_000
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: default_max_connections(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_lock_ttl(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
            git_commit: true,
            author_name: default_author_name(),
            author_email: default_author_email(),
            queryable_capacity: default_queryable_capacity(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for CoordinatorConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "conclave".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: CoordinatorConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Backend the operator asked for. Reachability is decided later by the
    /// startup probe.
    pub fn requested_backend(&self) -> StorageBackend {
        match &self.database_url {
            Some(url) if !url.trim().is_empty() => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: url.clone(),
                max_connections: self.max_connections,
            }),
            _ => StorageBackend::File(FileConfig {
                data_dir: self.data_dir.clone(),
            }),
        }
    }
}

impl CoordinatorConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CONCLAVE_CONFIG_PATH environment variable
    /// 2. ./conclave-config.yaml (working directory)
    /// 3. ~/.conclave/config.yaml (user home)
    /// 4. /etc/conclave/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CONCLAVE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./conclave-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user = home.join(".conclave").join("config.yaml");
            if user.exists() {
                return Some(user);
            }
        }

        let system = PathBuf::from("/etc/conclave/config.yaml");
        if system.exists() {
            return Some(system);
        }

        None
    }

    /// Load from the CLI-supplied path, else the discovered path, else
    /// defaults. Environment overrides are applied last.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = cli_path.or_else(Self::discover_config);

        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_yaml_file(&path).map_err(|e| {
                    anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e)
                })?
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        let database_url = std::env::var("CONCLAVE_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .ok();
        if let Some(url) = database_url {
            self.spec.storage.database_url = Some(url);
        }

        if let Ok(dir) = std::env::var("CONCLAVE_DATA_DIR") {
            self.spec.storage.data_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("CONCLAVE_LOGS_DIR") {
            self.spec.audit.logs_dir = PathBuf::from(dir);
        }

        if let Ok(val) = std::env::var("CONCLAVE_LOCK_TTL") {
            match humantime_serde::re::humantime::parse_duration(&val) {
                Ok(ttl) => self.spec.locks.default_ttl = ttl,
                Err(e) => {
                    tracing::warn!(
                        "Invalid value for CONCLAVE_LOCK_TTL: '{}' ({}). Ignoring.",
                        val,
                        e
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let spec = &self.spec;

        if spec.locks.default_ttl.is_zero() {
            anyhow::bail!("spec.locks.default_ttl must be greater than zero");
        }

        if spec.storage.max_connections == 0 {
            anyhow::bail!("spec.storage.max_connections must be greater than zero");
        }

        if spec.storage.data_dir.as_os_str().is_empty() {
            anyhow::bail!("spec.storage.data_dir cannot be empty");
        }

        if spec.audit.logs_dir.as_os_str().is_empty() {
            anyhow::bail!("spec.audit.logs_dir cannot be empty");
        }

        if spec.audit.queryable_capacity == 0 {
            anyhow::bail!("spec.audit.queryable_capacity must be greater than zero");
        }

        if spec.audit.queue_capacity == 0 {
            anyhow::bail!("spec.audit.queue_capacity must be greater than zero");
        }

        if spec.events.channel_capacity == 0 {
            anyhow::bail!("spec.events.channel_capacity must be greater than zero");
        }

        match spec.logging.format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!(
                "Invalid spec.logging.format: '{}'. Must be 'json' or 'text'",
                other
            ),
        }

        Ok(())
    }
}
