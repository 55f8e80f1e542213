// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL implementation of MemoryBackend
//!
//! Records live in `memory_records`, keyed by (namespace, key). The value is
//! stored as JSONB with its content type in a sibling column so text values
//! survive the round trip unchanged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::memory::{BackendKind, BackendStats, ContentType, MemoryRecord, MemoryValue};
use crate::domain::repository::{MemoryBackend, RepositoryError};
use crate::infrastructure::db::Database;

pub struct PostgresMemoryBackend {
    db: Database,
}

impl PostgresMemoryBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn deserialize_row(row: &sqlx::postgres::PgRow) -> Result<MemoryRecord, RepositoryError> {
        let namespace: String = row.try_get("namespace")
            .map_err(|e| RepositoryError::Database(format!("Missing namespace: {}", e)))?;
        let key: String = row.try_get("key")
            .map_err(|e| RepositoryError::Database(format!("Missing key: {}", e)))?;
        let raw: serde_json::Value = row.try_get("value")
            .map_err(|e| RepositoryError::Database(format!("Missing value: {}", e)))?;
        let content_type: String = row.try_get("content_type")
            .map_err(|e| RepositoryError::Database(format!("Missing content_type: {}", e)))?;
        let created_at: DateTime<Utc> = row.try_get("created_at")
            .map_err(|e| RepositoryError::Database(format!("Missing created_at: {}", e)))?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")
            .map_err(|e| RepositoryError::Database(format!("Missing updated_at: {}", e)))?;

        let content_type = ContentType::parse(&content_type).ok_or_else(|| {
            RepositoryError::Serialization(format!("Unknown content type: {}", content_type))
        })?;
        let value = MemoryValue::from_parts(content_type, raw)?;

        Ok(MemoryRecord::new(namespace, key, value, created_at, updated_at))
    }
}

/// Escape LIKE metacharacters so a prefix matches literally.
pub(crate) fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl MemoryBackend for PostgresMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn connect(&self) -> bool {
        if let Err(e) = self.db.ping().await {
            warn!("PostgreSQL unreachable: {}", e);
            return false;
        }
        match self.db.migrate().await {
            Ok(()) => true,
            Err(e) => {
                warn!("PostgreSQL schema setup failed: {}", e);
                false
            }
        }
    }

    async fn read(&self, namespace: &str, key: &str) -> Option<MemoryRecord> {
        let row = sqlx::query(
            r#"
            SELECT namespace, key, value, content_type, created_at, updated_at
            FROM memory_records
            WHERE namespace = $1 AND key = $2
            "#,
        )
        .bind(namespace)
        .bind(key)
        .fetch_optional(self.db.get_pool())
        .await;

        match row {
            Ok(Some(row)) => match Self::deserialize_row(&row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(namespace, key, "Discarding unreadable record: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(namespace, key, "Read failed: {}", e);
                None
            }
        }
    }

    async fn write(
        &self,
        namespace: &str,
        key: &str,
        value: &MemoryValue,
    ) -> Result<MemoryRecord, RepositoryError> {
        let (content_type, raw) = value.to_parts();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO memory_records (namespace, key, value, content_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (namespace, key) DO UPDATE SET
                value = EXCLUDED.value,
                content_type = EXCLUDED.content_type,
                updated_at = EXCLUDED.updated_at
            RETURNING namespace, key, value, content_type, created_at, updated_at
            "#,
        )
        .bind(namespace)
        .bind(key)
        .bind(&raw)
        .bind(content_type.as_str())
        .bind(now)
        .fetch_one(self.db.get_pool())
        .await?;

        debug!(namespace, key, "Record upserted");
        Self::deserialize_row(&row)
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM memory_records WHERE namespace = $1 AND key = $2")
            .bind(namespace)
            .bind(key)
            .execute(self.db.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, namespace: &str, prefix: &str) -> Vec<String> {
        let rows = sqlx::query(
            r#"
            SELECT key FROM memory_records
            WHERE namespace = $1 AND key LIKE $2 ESCAPE '\'
            "#,
        )
        .bind(namespace)
        .bind(escape_like(prefix))
        .fetch_all(self.db.get_pool())
        .await;

        match rows {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| row.try_get::<String, _>("key").ok())
                .collect(),
            Err(e) => {
                warn!(namespace, prefix, "List failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn stats(&self) -> BackendStats {
        let rows = sqlx::query(
            "SELECT namespace, COUNT(*) AS count FROM memory_records GROUP BY namespace",
        )
        .fetch_all(self.db.get_pool())
        .await;

        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Stats query failed: {}", e);
                return BackendStats::disconnected(BackendKind::Postgres);
            }
        };

        let mut namespaces = BTreeMap::new();
        for row in &rows {
            let namespace: Result<String, _> = row.try_get("namespace");
            let count: Result<i64, _> = row.try_get("count");
            if let (Ok(namespace), Ok(count)) = (namespace, count) {
                namespaces.insert(namespace, count.max(0) as u64);
            }
        }

        BackendStats {
            backend: BackendKind::Postgres,
            connected: true,
            total_records: namespaces.values().sum(),
            namespaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_plain_prefix() {
        assert_eq!(escape_like("task-"), "task-%");
        assert_eq!(escape_like(""), "%");
    }

    #[test]
    fn test_escape_like_metacharacters() {
        assert_eq!(escape_like("a_b%"), "a\\_b\\%%");
        assert_eq!(escape_like("c\\d"), "c\\\\d%");
    }
}
