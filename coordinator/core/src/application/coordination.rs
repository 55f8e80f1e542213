// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Coordination Facade
//!
//! Single entry point for namespaced memory. Mutations follow a fixed
//! sequence:
//!
//! ```text
//! validate -> acquire lease -> mutate backend -> audit -> release lease -> notify
//! ```
//!
//! Lease contention fails fast with `CoordinationError::LockConflict`. The
//! lease is released on every exit path after acquisition, including a
//! failed backend call. The sequence runs in its own task, so a caller that
//! stops polling does not cancel a mutation halfway.
//!
//! Reads and listings bypass the lease entirely and may observe a value that
//! is being replaced concurrently. `update` is the read-modify-write form: the
//! read, the caller's transition and the write all happen under one lease.
//!
//! Audit entries are recorded while the lease is held, so their sequence
//! numbers follow commit order for any single `(namespace, key)`. Mutations
//! of different keys commit independently and their relative sequence order
//! is unspecified.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::audit_logger::AuditLogger;
use crate::application::backend_factory::{select_backend, SelectedBackend};
use crate::application::lock_manager::LockManager;
use crate::domain::audit::{AuditEntry, AuditOperation};
use crate::domain::config::CoordinatorConfig;
use crate::domain::error::{AuditWriteError, CoordinationError};
use crate::domain::events::RealtimeEvent;
use crate::domain::memory::{BackendKind, BackendStats, MemoryRecord, MemoryValue};
use crate::domain::repository::{MemoryBackend, RepositoryError};
use crate::domain::validation::{validate_key, validate_namespace, validate_prefix};
use crate::infrastructure::audit_file::FlatFileAuditSink;
use crate::infrastructure::event_bus::EventBus;

/// Snapshot returned by `CoordinationFacade::health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub backend: BackendKind,
    pub connected: bool,
    pub stats: BackendStats,
    pub active_locks: u64,
    pub subscribers: usize,
}

struct FacadeInner {
    backend: Arc<dyn MemoryBackend>,
    locks: LockManager,
    audit: Arc<AuditLogger>,
    events: EventBus,
}

#[derive(Clone)]
pub struct CoordinationFacade {
    inner: Arc<FacadeInner>,
}

impl CoordinationFacade {
    pub fn new(
        selected: SelectedBackend,
        default_ttl: Duration,
        audit: Arc<AuditLogger>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(FacadeInner {
                backend: selected.backend,
                locks: LockManager::new(selected.locks, default_ttl),
                audit,
                events,
            }),
        }
    }

    /// Select the backend, start the audit worker and wire everything up.
    /// The returned handle is the audit worker task.
    pub async fn from_config(
        config: &CoordinatorConfig,
    ) -> Result<(Self, JoinHandle<()>), CoordinationError> {
        let selected = select_backend(&config.storage, &config.audit).await?;
        let (audit, worker) = AuditLogger::start(
            selected.audit.clone(),
            FlatFileAuditSink::new(&config.audit),
            config.audit.queue_capacity,
        );
        let events = EventBus::new(config.events.channel_capacity);

        info!(
            backend = %selected.kind(),
            lock_ttl = ?config.locks.default_ttl,
            "Coordination facade ready"
        );
        Ok((Self::new(selected, config.locks.default_ttl, audit, events), worker))
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.inner.backend.kind()
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub async fn read(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<MemoryRecord>, CoordinationError> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        Ok(self.inner.backend.read(namespace, key).await)
    }

    pub async fn list(&self, namespace: &str, prefix: &str) -> Result<Vec<String>, CoordinationError> {
        validate_namespace(namespace)?;
        validate_prefix(prefix)?;
        Ok(self.inner.backend.list(namespace, prefix).await)
    }

    /// Upsert under a lease. Returns the stored record.
    pub async fn write(
        &self,
        namespace: &str,
        key: &str,
        value: MemoryValue,
        actor: &str,
    ) -> Result<MemoryRecord, CoordinationError> {
        validate_namespace(namespace)?;
        validate_key(key)?;

        let inner = self.inner.clone();
        let (namespace, key, actor) = (namespace.to_string(), key.to_string(), actor.to_string());
        tokio::spawn(async move { inner.write_locked(&namespace, &key, value, &actor).await })
            .await
            .map_err(join_error)?
    }

    /// Read, transform and write one record under a single lease.
    ///
    /// `apply` receives the current record (`None` if absent) and returns
    /// the value to store. An error from `apply` releases the lease and is
    /// returned unchanged; nothing is written, audited or broadcast.
    pub async fn update<F>(
        &self,
        namespace: &str,
        key: &str,
        actor: &str,
        apply: F,
    ) -> Result<MemoryRecord, CoordinationError>
    where
        F: FnOnce(Option<MemoryRecord>) -> Result<MemoryValue, CoordinationError> + Send + 'static,
    {
        validate_namespace(namespace)?;
        validate_key(key)?;

        let inner = self.inner.clone();
        let (namespace, key, actor) = (namespace.to_string(), key.to_string(), actor.to_string());
        tokio::spawn(async move { inner.update_locked(&namespace, &key, &actor, apply).await })
            .await
            .map_err(join_error)?
    }

    /// Delete under a lease. `Ok(false)` when the key was absent; nothing
    /// is audited or broadcast in that case.
    pub async fn delete(&self, namespace: &str, key: &str, actor: &str) -> Result<bool, CoordinationError> {
        validate_namespace(namespace)?;
        validate_key(key)?;

        let inner = self.inner.clone();
        let (namespace, key, actor) = (namespace.to_string(), key.to_string(), actor.to_string());
        tokio::spawn(async move { inner.delete_locked(&namespace, &key, &actor).await })
            .await
            .map_err(join_error)?
    }

    /// Take a lease outside the mutation path. While it is held, facade
    /// `write`, `update` and `delete` on the same pair fail with
    /// `LockConflict`; it ends with `release_lock` or when the TTL lapses.
    pub async fn acquire_lock(
        &self,
        namespace: &str,
        key: &str,
        ttl: Option<Duration>,
        holder: &str,
    ) -> Result<bool, CoordinationError> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.inner.locks.acquire_lock(namespace, key, ttl, holder).await
    }

    pub async fn release_lock(&self, namespace: &str, key: &str) -> Result<(), CoordinationError> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.inner.locks.release_lock(namespace, key).await
    }

    pub async fn recent_audit(
        &self,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, CoordinationError> {
        if let Some(namespace) = namespace {
            validate_namespace(namespace)?;
        }
        self.inner.audit.recent(namespace, limit).await
    }

    /// Wait for the flat-file audit sink to catch up.
    pub async fn flush_audit(&self) -> Result<(), AuditWriteError> {
        self.inner.audit.flush().await
    }

    pub async fn health(&self) -> HealthReport {
        let stats = self.inner.backend.stats().await;
        HealthReport {
            backend: self.inner.backend.kind(),
            connected: stats.connected,
            active_locks: self.inner.locks.active_locks().await,
            subscribers: self.inner.events.subscriber_count(),
            stats,
        }
    }
}

impl FacadeInner {
    async fn acquire(&self, namespace: &str, key: &str, actor: &str) -> Result<String, CoordinationError> {
        let holder = format!("{}:{}", actor, Uuid::new_v4());
        if !self.locks.acquire_lock(namespace, key, None, &holder).await? {
            debug!(namespace, key, actor, "Lease busy");
            return Err(CoordinationError::lock_conflict(namespace, key));
        }
        Ok(holder)
    }

    async fn release(&self, namespace: &str, key: &str, holder: &str) {
        if let Err(e) = self.locks.release_lock(namespace, key).await {
            // The lease still expires after its TTL.
            warn!(namespace, key, holder, "Failed to release lease: {}", e);
        }
    }

    async fn write_locked(
        &self,
        namespace: &str,
        key: &str,
        value: MemoryValue,
        actor: &str,
    ) -> Result<MemoryRecord, CoordinationError> {
        let holder = self.acquire(namespace, key, actor).await?;
        self.store_and_release(namespace, key, value, actor, &holder).await
    }

    async fn update_locked<F>(
        &self,
        namespace: &str,
        key: &str,
        actor: &str,
        apply: F,
    ) -> Result<MemoryRecord, CoordinationError>
    where
        F: FnOnce(Option<MemoryRecord>) -> Result<MemoryValue, CoordinationError>,
    {
        let holder = self.acquire(namespace, key, actor).await?;

        let current = self.backend.read(namespace, key).await;
        let value = match apply(current) {
            Ok(value) => value,
            Err(e) => {
                self.release(namespace, key, &holder).await;
                return Err(e);
            }
        };
        self.store_and_release(namespace, key, value, actor, &holder).await
    }

    /// Write, audit on success, release, then notify. Caller holds the lease.
    async fn store_and_release(
        &self,
        namespace: &str,
        key: &str,
        value: MemoryValue,
        actor: &str,
        holder: &str,
    ) -> Result<MemoryRecord, CoordinationError> {
        let result = self.backend.write(namespace, key, &value).await;
        if result.is_ok() {
            self.audit
                .record(namespace, key, AuditOperation::Write, actor, Some(&value))
                .await;
        }
        self.release(namespace, key, holder).await;

        let record = result?;
        self.notify(namespace, key, AuditOperation::Write, actor);
        Ok(record)
    }

    async fn delete_locked(&self, namespace: &str, key: &str, actor: &str) -> Result<bool, CoordinationError> {
        let holder = self.acquire(namespace, key, actor).await?;

        let result = self.backend.delete(namespace, key).await;
        if let Ok(true) = result {
            self.audit
                .record(namespace, key, AuditOperation::Delete, actor, None)
                .await;
        }
        self.release(namespace, key, &holder).await;

        let deleted = result?;
        if deleted {
            self.notify(namespace, key, AuditOperation::Delete, actor);
        }
        Ok(deleted)
    }

    fn notify(&self, namespace: &str, key: &str, operation: AuditOperation, actor: &str) {
        self.events.publish(RealtimeEvent::MemoryUpdated {
            namespace: namespace.to_string(),
            key: key.to_string(),
            operation,
            actor: actor.to_string(),
        });
    }
}

fn join_error(err: tokio::task::JoinError) -> CoordinationError {
    CoordinationError::Persistence(RepositoryError::Unknown(format!(
        "mutation task failed: {}",
        err
    )))
}
