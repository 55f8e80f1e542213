// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts used by the application layer, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Concern | Implementations |
//! |-------|---------|----------------|
//! | `MemoryBackend` | namespaced records | `PostgresMemoryBackend`, `FileMemoryBackend` |
//! | `LockStore` | lease rows | `PostgresLockStore`, `InMemoryLockStore` |
//! | `AuditRepository` | queryable audit log | `PostgresAuditRepository`, `InMemoryAuditRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! The concrete set is selected once at startup by
//! `crate::application::backend_factory`: PostgreSQL when a database URL is
//! configured and reachable, the file store otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::audit::AuditEntry;
use crate::domain::lock::Lock;
use crate::domain::memory::{BackendKind, BackendStats, MemoryRecord, MemoryValue};

/// Storage strategy resolved from configuration.
#[derive(Debug, Clone)]
pub enum StorageBackend {
    File(FileConfig),
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct FileConfig {
    pub data_dir: std::path::PathBuf,
}

/// Record persistence contract.
///
/// Reads and listings soft-fail: an unavailable backend yields `None` or an
/// empty list (and a warning in the log). Mutations fail with a typed error
/// so the caller can still release its lease.
#[async_trait]
pub trait MemoryBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Idempotent readiness probe. Returns `false` instead of failing.
    async fn connect(&self) -> bool;

    async fn read(&self, namespace: &str, key: &str) -> Option<MemoryRecord>;

    /// Upsert: insert if absent, otherwise overwrite value and bump `updated_at`.
    async fn write(
        &self,
        namespace: &str,
        key: &str,
        value: &MemoryValue,
    ) -> Result<MemoryRecord, RepositoryError>;

    /// Returns `true` iff a record was removed.
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, RepositoryError>;

    /// Keys of `namespace` starting with `prefix`, in no particular order.
    async fn list(&self, namespace: &str, prefix: &str) -> Vec<String>;

    async fn stats(&self) -> BackendStats;
}

/// Lease row storage. Uniqueness of (namespace, key) is enforced by the
/// store itself and is the only arbiter between concurrent acquirers.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Delete every lease expired at `now`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;

    /// Insert `lock` unless a lease already exists for its pair.
    async fn try_insert(&self, lock: &Lock) -> Result<bool, RepositoryError>;

    /// Unconditional, idempotent delete.
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), RepositoryError>;

    async fn count_active(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Queryable side of the audit trail.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError>;

    /// Newest first, optionally restricted to one namespace.
    async fn recent(
        &self,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepositoryError::Unavailable(err.to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(err.to_string())
    }
}
