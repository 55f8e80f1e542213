// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Identifier Validation Domain Service
//!
//! Namespaces and keys end up as file names (fallback store, audit trail)
//! and as SQL parameters, so they are restricted to a conservative alphabet
//! and rejected before any backend sees them.
//!
//! # Rules
//! - Allowed characters: ASCII letters, digits, `_`, `-`, `.`, `:`
//! - Must not start with `.` (no hidden files, no `..` traversal)
//! - Namespace length 1..=64, key length 1..=255

use crate::domain::error::CoordinationError;

pub const MAX_NAMESPACE_LEN: usize = 64;
pub const MAX_KEY_LEN: usize = 255;

pub fn validate_namespace(namespace: &str) -> Result<(), CoordinationError> {
    validate_identifier("namespace", namespace, MAX_NAMESPACE_LEN)
}

pub fn validate_key(key: &str) -> Result<(), CoordinationError> {
    validate_identifier("key", key, MAX_KEY_LEN)
}

/// Key prefixes may be empty (list everything) but otherwise follow key rules.
pub fn validate_prefix(prefix: &str) -> Result<(), CoordinationError> {
    if prefix.is_empty() {
        return Ok(());
    }
    if prefix.len() > MAX_KEY_LEN {
        return Err(CoordinationError::validation(
            "prefix",
            format!("must be at most {} characters", MAX_KEY_LEN),
        ));
    }
    if let Some(c) = prefix.chars().find(|c| !is_allowed(*c)) {
        return Err(CoordinationError::validation(
            "prefix",
            format!("contains invalid character {:?}", c),
        ));
    }
    Ok(())
}

pub fn validate_identifier(
    field: &str,
    value: &str,
    max_len: usize,
) -> Result<(), CoordinationError> {
    if value.is_empty() {
        return Err(CoordinationError::validation(field, "cannot be empty"));
    }

    if value.len() > max_len {
        return Err(CoordinationError::validation(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    if value.starts_with('.') {
        return Err(CoordinationError::validation(field, "cannot start with '.'"));
    }

    if let Some(c) = value.chars().find(|c| !is_allowed(*c)) {
        return Err(CoordinationError::validation(
            field,
            format!("contains invalid character {:?}", c),
        ));
    }

    Ok(())
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}
