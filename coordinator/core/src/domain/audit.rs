// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Entries
//!
//! Immutable record of one committed mutation. Entries carry a
//! process-monotonic sequence number so that their order can be recovered
//! from any sink, and a truncated preview of the written payload rather
//! than the payload itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of characters kept in `AuditEntry::preview`.
pub const PREVIEW_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Write,
    Delete,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::Write => "write",
            AuditOperation::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "write" => Some(AuditOperation::Write),
            "delete" => Some(AuditOperation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub namespace: String,
    pub key: String,
    pub operation: AuditOperation,
    pub actor: String,
    pub preview: String,
}

impl AuditEntry {
    /// Commit message for the version-controlled trail.
    pub fn commit_message(&self) -> String {
        format!("feat({}): {} on {}", self.namespace, self.operation, self.key)
    }
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(operation: AuditOperation) -> AuditEntry {
        AuditEntry {
            sequence: 1,
            timestamp: Utc::now(),
            namespace: "agents".into(),
            key: "task-1".into(),
            operation,
            actor: "tester".into(),
            preview: String::new(),
        }
    }

    #[test]
    fn test_commit_message_pattern() {
        assert_eq!(entry(AuditOperation::Write).commit_message(), "feat(agents): write on task-1");
        assert_eq!(entry(AuditOperation::Delete).commit_message(), "feat(agents): delete on task-1");
    }

    #[test]
    fn test_truncate_preview_short_text_untouched() {
        assert_eq!(truncate_preview("abc", 5), "abc");
        assert_eq!(truncate_preview("abcde", 5), "abcde");
    }

    #[test]
    fn test_truncate_preview_respects_char_boundaries() {
        assert_eq!(truncate_preview("abcdef", 3), "abc...");
        assert_eq!(truncate_preview("ééééé", 2), "éé...");
    }

    #[test]
    fn test_operation_roundtrip_through_str() {
        for op in [AuditOperation::Write, AuditOperation::Delete] {
            assert_eq!(AuditOperation::parse(op.as_str()), Some(op));
        }
    }
}
