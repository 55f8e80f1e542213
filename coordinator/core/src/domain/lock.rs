// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Leases
//!
//! A `Lock` is a time-bounded grant over one (namespace, key) pair.
//! Acquisition never waits: a caller either wins the lease or is told the
//! resource is busy. A holder that crashes blocks others for at most one
//! TTL window, after which the lease is purged lazily by the next acquirer.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TTL applied when the caller does not supply one.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub namespace: String,
    pub key: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lock {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        holder: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self::starting_at(namespace, key, holder, ttl, Utc::now())
    }

    pub fn starting_at(
        namespace: impl Into<String>,
        key: impl Into<String>,
        holder: impl Into<String>,
        ttl: Duration,
        acquired_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| acquired_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            namespace: namespace.into(),
            key: key.into(),
            holder: holder.into(),
            acquired_at,
            expires_at,
        }
    }

    /// A lease is dead from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let start = Utc::now();
        let lock = Lock::starting_at("agents", "task-1", "h", Duration::from_millis(100), start);

        assert!(!lock.is_expired_at(start));
        assert!(!lock.is_expired_at(start + TimeDelta::milliseconds(99)));
        assert!(lock.is_expired_at(start + TimeDelta::milliseconds(100)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let lock = Lock::new("ns", "k", "h", Duration::MAX);
        assert_eq!(lock.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(!lock.is_expired());
    }
}
