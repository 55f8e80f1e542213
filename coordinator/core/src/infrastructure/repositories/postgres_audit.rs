// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL implementation of AuditRepository
//!
//! Queryable half of the audit trail. Rows are append-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;

use crate::domain::audit::{AuditEntry, AuditOperation};
use crate::domain::repository::{AuditRepository, RepositoryError};
use crate::infrastructure::db::Database;

pub struct PostgresAuditRepository {
    db: Database,
}

impl PostgresAuditRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn deserialize_row(row: &sqlx::postgres::PgRow) -> Result<AuditEntry, RepositoryError> {
        let sequence: i64 = row.try_get("sequence")
            .map_err(|e| RepositoryError::Database(format!("Missing sequence: {}", e)))?;
        let timestamp: DateTime<Utc> = row.try_get("timestamp")
            .map_err(|e| RepositoryError::Database(format!("Missing timestamp: {}", e)))?;
        let operation: String = row.try_get("operation")
            .map_err(|e| RepositoryError::Database(format!("Missing operation: {}", e)))?;
        let operation = AuditOperation::parse(&operation).ok_or_else(|| {
            RepositoryError::Serialization(format!("Unknown audit operation: {}", operation))
        })?;

        Ok(AuditEntry {
            sequence: sequence.max(0) as u64,
            timestamp,
            namespace: row.try_get("namespace")?,
            key: row.try_get("key")?,
            operation,
            actor: row.try_get("actor")?,
            preview: row.try_get("preview")?,
        })
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO memory_audit_log (sequence, timestamp, namespace, key, operation, actor, preview)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.sequence as i64)
        .bind(entry.timestamp)
        .bind(&entry.namespace)
        .bind(&entry.key)
        .bind(entry.operation.as_str())
        .bind(&entry.actor)
        .bind(&entry.preview)
        .execute(self.db.get_pool())
        .await?;

        debug!(sequence = entry.sequence, "Audit row appended");
        Ok(())
    }

    async fn recent(
        &self,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT sequence, timestamp, namespace, key, operation, actor, preview
            FROM memory_audit_log
            WHERE $1::TEXT IS NULL OR namespace = $1
            ORDER BY timestamp DESC, sequence DESC
            LIMIT $2
            "#,
        )
        .bind(namespace)
        .bind(limit.min(i64::MAX as usize) as i64)
        .fetch_all(self.db.get_pool())
        .await?;

        rows.iter().map(Self::deserialize_row).collect()
    }
}
