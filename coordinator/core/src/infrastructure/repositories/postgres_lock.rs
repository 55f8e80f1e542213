// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL implementation of LockStore
//!
//! The primary key on `memory_locks (namespace, key)` is the sole arbiter
//! between concurrent acquirers: `ON CONFLICT DO NOTHING` lets exactly one
//! insert win, and `rows_affected` tells the caller whether it was theirs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::domain::lock::Lock;
use crate::domain::repository::{LockStore, RepositoryError};
use crate::infrastructure::db::Database;

pub struct PostgresLockStore {
    db: Database,
}

impl PostgresLockStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LockStore for PostgresLockStore {
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM memory_locks WHERE expires_at <= $1")
            .bind(now)
            .execute(self.db.get_pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn try_insert(&self, lock: &Lock) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO memory_locks (namespace, key, holder, acquired_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (namespace, key) DO NOTHING
            "#,
        )
        .bind(&lock.namespace)
        .bind(&lock.key)
        .bind(&lock.holder)
        .bind(lock.acquired_at)
        .bind(lock.expires_at)
        .execute(self.db.get_pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM memory_locks WHERE namespace = $1 AND key = $2")
            .bind(namespace)
            .bind(key)
            .execute(self.db.get_pool())
            .await?;
        Ok(())
    }

    async fn count_active(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM memory_locks WHERE expires_at > $1")
            .bind(now)
            .fetch_one(self.db.get_pool())
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }
}
