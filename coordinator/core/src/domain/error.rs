// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Coordination Errors
//!
//! Typed failures surfaced by the coordination facade. The presentation
//! layer maps them to HTTP status codes:
//!
//! | Variant | Status |
//! |---------|--------|
//! | `Validation` | 400 |
//! | `NotFound` | 404 |
//! | `LockConflict` | 409 |
//! | `Connection`, `Persistence` | 500 |
//!
//! `AuditWriteError` is a separate type: audit sinks are
//! best-effort and their failures never reach a caller.

use thiserror::Error;

use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum CoordinationError {
    /// Backend unreachable at startup (drives fallback selection)
    #[error("Backend unavailable: {0}")]
    Connection(String),

    /// Lease already held by another caller
    #[error("Resource busy: {namespace}/{key} is locked")]
    LockConflict { namespace: String, key: String },

    /// Malformed input rejected before reaching the backend
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Mutation failed after the lock was acquired (lock is still released)
    #[error("Persistence failed: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl CoordinationError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoordinationError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn lock_conflict(namespace: &str, key: &str) -> Self {
        CoordinationError::LockConflict {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    /// Whether backing off and retrying the same call can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoordinationError::LockConflict { .. })
    }
}

impl From<serde_json::Error> for CoordinationError {
    fn from(err: serde_json::Error) -> Self {
        CoordinationError::Persistence(RepositoryError::Serialization(err.to_string()))
    }
}

/// Failure of a best-effort audit sink. Logged, never propagated.
#[derive(Debug, Error)]
pub enum AuditWriteError {
    #[error("Audit file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit commit failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Audit repository append failed: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Audit task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lock_conflicts_are_retryable() {
        assert!(CoordinationError::lock_conflict("agents", "task-1").is_retryable());
        assert!(!CoordinationError::validation("key", "empty").is_retryable());
        assert!(!CoordinationError::Connection("down".into()).is_retryable());
    }

    #[test]
    fn test_lock_conflict_message_names_resource() {
        let err = CoordinationError::lock_conflict("agents", "task-1");
        assert_eq!(err.to_string(), "Resource busy: agents/task-1 is locked");
    }
}
