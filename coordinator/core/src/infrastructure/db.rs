// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that is
//! injected into every PostgreSQL repository. The pool is created lazily so
//! that building it never blocks startup; reachability is established by
//! `ping()` during the backend probe.
//!
//! The pool is size-bounded (`storage.max_connections`). Requests beyond the
//! bound wait inside the pool up to the acquire timeout.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::domain::repository::RepositoryError;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Schema statements, applied idempotently on first successful connect.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS memory_records (
        namespace    TEXT        NOT NULL,
        key          TEXT        NOT NULL,
        value        JSONB       NOT NULL,
        content_type TEXT        NOT NULL CHECK (content_type IN ('structured', 'text')),
        created_at   TIMESTAMPTZ NOT NULL,
        updated_at   TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (namespace, key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS memory_locks (
        namespace   TEXT        NOT NULL,
        key         TEXT        NOT NULL,
        holder      TEXT        NOT NULL,
        acquired_at TIMESTAMPTZ NOT NULL,
        expires_at  TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (namespace, key)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS memory_locks_expires_at_idx ON memory_locks (expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS memory_audit_log (
        id        BIGSERIAL   PRIMARY KEY,
        sequence  BIGINT      NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        namespace TEXT        NOT NULL,
        key       TEXT        NOT NULL,
        operation TEXT        NOT NULL,
        actor     TEXT        NOT NULL,
        preview   TEXT        NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS memory_audit_log_namespace_idx ON memory_audit_log (namespace, id)",
];

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    migrated: std::sync::Arc<OnceCell<()>>,
}

impl Database {
    /// Build a lazily-connecting pool. Fails only on a malformed URL.
    pub fn connect_lazy(connection_string: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(connection_string)
            .map_err(|e| RepositoryError::Unavailable(format!("Invalid database URL: {}", e)))?;

        Ok(Self {
            pool,
            migrated: std::sync::Arc::new(OnceCell::new()),
        })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create tables and indexes once per process.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        self.migrated
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                tracing::info!("PostgreSQL schema ready");
                Ok::<(), RepositoryError>(())
            })
            .await?;
        Ok(())
    }
}
