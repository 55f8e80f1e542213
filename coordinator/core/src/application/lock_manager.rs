// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lock Manager Application Service
//!
//! Grants non-blocking leases over (namespace, key) pairs. Acquisition
//! purges every expired lease, then attempts a single guarded insert: the
//! lock store's uniqueness rule decides the winner. There is no wait queue.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::error::CoordinationError;
use crate::domain::lock::Lock;
use crate::domain::repository::LockStore;

pub struct LockManager {
    store: Arc<dyn LockStore>,
    default_ttl: Duration,
}

impl LockManager {
    pub fn new(store: Arc<dyn LockStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Try to take the lease. `Ok(false)` means another holder has it.
    pub async fn acquire_lock(
        &self,
        namespace: &str,
        key: &str,
        ttl: Option<Duration>,
        holder: &str,
    ) -> Result<bool, CoordinationError> {
        let now = Utc::now();
        let purged = self.store.purge_expired(now).await?;
        if purged > 0 {
            debug!(purged, "Purged expired leases");
        }

        let lock = Lock::starting_at(namespace, key, holder, ttl.unwrap_or(self.default_ttl), now);
        let acquired = self.store.try_insert(&lock).await?;
        debug!(namespace, key, holder, acquired, "Lease acquisition attempted");
        Ok(acquired)
    }

    /// Unconditional and idempotent.
    pub async fn release_lock(&self, namespace: &str, key: &str) -> Result<(), CoordinationError> {
        self.store.remove(namespace, key).await?;
        Ok(())
    }

    /// Number of non-expired leases. Reports 0 when the store cannot answer.
    pub async fn active_locks(&self) -> u64 {
        match self.store.count_active(Utc::now()).await {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to count active leases: {}", e);
                0
            }
        }
    }
}
