// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the persistence contracts defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve records, leases and audit entries
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL
//!
//! - **PostgresMemoryBackend** - `memory_records` table
//! - **PostgresLockStore** - `memory_locks` table, PK-arbitrated leases
//! - **PostgresAuditRepository** - `memory_audit_log` table
//!
//! ## Fallback
//!
//! - **FileMemoryBackend** - one JSON document per namespace
//! - **InMemoryLockStore** - sharded lease table, entry-level atomic insert
//! - **InMemoryAuditRepository** - bounded ring of recent entries

pub mod file_memory;
pub mod postgres_audit;
pub mod postgres_lock;
pub mod postgres_memory;

pub use file_memory::FileMemoryBackend;
pub use postgres_audit::PostgresAuditRepository;
pub use postgres_lock::PostgresLockStore;
pub use postgres_memory::PostgresMemoryBackend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::domain::audit::AuditEntry;
use crate::domain::lock::Lock;
use crate::domain::repository::{AuditRepository, LockStore, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryLockStore {
    leases: Arc<DashMap<(String, String), Lock>>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let before = self.leases.len();
        self.leases.retain(|_, lock| !lock.is_expired_at(now));
        Ok(before.saturating_sub(self.leases.len()) as u64)
    }

    async fn try_insert(&self, lock: &Lock) -> Result<bool, RepositoryError> {
        let pair = (lock.namespace.clone(), lock.key.clone());
        // The shard lock is held for the whole match, so check-and-insert is atomic.
        match self.leases.entry(pair) {
            Entry::Vacant(slot) => {
                slot.insert(lock.clone());
                Ok(true)
            }
            Entry::Occupied(mut slot) if slot.get().is_expired_at(lock.acquired_at) => {
                slot.insert(lock.clone());
                Ok(true)
            }
            Entry::Occupied(_) => Ok(false),
        }
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), RepositoryError> {
        self.leases.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn count_active(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        Ok(self
            .leases
            .iter()
            .filter(|lease| !lease.value().is_expired_at(now))
            .count() as u64)
    }
}

/// Bounded, newest-wins audit log for the fallback configuration.
#[derive(Clone)]
pub struct InMemoryAuditRepository {
    entries: Arc<RwLock<VecDeque<AuditEntry>>>,
    capacity: usize,
}

impl InMemoryAuditRepository {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        Ok(())
    }

    async fn recent(
        &self,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.read();
        let mut matching: Vec<AuditEntry> = entries
            .iter()
            .filter(|entry| namespace.is_none_or(|ns| entry.namespace == ns))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        matching.truncate(limit);
        Ok(matching)
    }
}
