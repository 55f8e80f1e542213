// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Memory Records
//!
//! A `MemoryRecord` is one value stored under a (namespace, key) pair. The
//! content type is carried explicitly alongside the payload and is never
//! re-derived from the stored bytes, so a structured JSON string and a raw
//! text value stay distinguishable after a round trip through any backend.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Record aggregate, value representation, backend statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::repository::RepositoryError;

/// How a stored value must be interpreted on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Structured,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Structured => "structured",
            ContentType::Text => "text",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "structured" => Some(ContentType::Structured),
            "text" => Some(ContentType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a memory record.
///
/// On the wire (HTTP bodies, WebSocket frames) a JSON string maps to `Text`
/// and every other JSON value maps to `Structured`. Backends persist the
/// content type next to the value, so `Structured(Value::String(_))` written
/// through the Rust API reads back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemoryValue {
    Text(String),
    Structured(serde_json::Value),
}

impl MemoryValue {
    pub fn content_type(&self) -> ContentType {
        match self {
            MemoryValue::Text(_) => ContentType::Text,
            MemoryValue::Structured(_) => ContentType::Structured,
        }
    }

    /// Interpret a wire value: strings become text, everything else structured.
    pub fn from_wire(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => MemoryValue::Text(text),
            other => MemoryValue::Structured(other),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MemoryValue::Text(text) => serde_json::Value::String(text.clone()),
            MemoryValue::Structured(value) => value.clone(),
        }
    }

    /// Split into the (content type, JSON value) pair persisted by backends.
    pub fn to_parts(&self) -> (ContentType, serde_json::Value) {
        (self.content_type(), self.to_json())
    }

    /// Rebuild from a persisted pair. A text record whose stored value is
    /// not a JSON string is corrupt.
    pub fn from_parts(
        content_type: ContentType,
        value: serde_json::Value,
    ) -> Result<Self, RepositoryError> {
        match (content_type, value) {
            (ContentType::Structured, value) => Ok(MemoryValue::Structured(value)),
            (ContentType::Text, serde_json::Value::String(text)) => Ok(MemoryValue::Text(text)),
            (ContentType::Text, other) => Err(RepositoryError::Serialization(format!(
                "text record holds non-string value: {}",
                other
            ))),
        }
    }

    /// Compact single-line rendering used for audit previews.
    pub fn render(&self) -> String {
        match self {
            MemoryValue::Text(text) => text.clone(),
            MemoryValue::Structured(value) => value.to_string(),
        }
    }
}

impl From<&str> for MemoryValue {
    fn from(value: &str) -> Self {
        MemoryValue::Text(value.to_string())
    }
}

impl From<serde_json::Value> for MemoryValue {
    fn from(value: serde_json::Value) -> Self {
        MemoryValue::Structured(value)
    }
}

/// Memory record aggregate
///
/// Unique per (namespace, key). `created_at` survives overwrites; every
/// upsert bumps `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub namespace: String,
    pub key: String,
    pub value: MemoryValue,
    pub content_type: ContentType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryRecord {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: MemoryValue,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let content_type = value.content_type();
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value,
            content_type,
            created_at,
            updated_at,
        }
    }
}

/// Which storage strategy the facade selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Postgres,
    File,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Postgres => f.write_str("postgres"),
            BackendKind::File => f.write_str("file"),
        }
    }
}

/// Aggregate counts reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendStats {
    pub backend: BackendKind,
    pub connected: bool,
    pub total_records: u64,
    pub namespaces: BTreeMap<String, u64>,
}

impl BackendStats {
    pub fn disconnected(backend: BackendKind) -> Self {
        Self {
            backend,
            connected: false,
            total_records: 0,
            namespaces: BTreeMap::new(),
        }
    }
}
