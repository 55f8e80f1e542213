// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! File-backed MemoryBackend
//!
//! Fallback store used when PostgreSQL is not configured or unreachable.
//! Each namespace is one JSON document at `<data_dir>/<namespace>.json`, an
//! object keyed by record key. Namespaces are validated before they reach
//! this module, so the file name never contains a path separator.
//!
//! Every mutation rewrites the whole namespace file through a temp file that
//! is fsynced before an atomic rename, followed by an fsync of the data
//! directory. A zero-length namespace file is read as an empty namespace so
//! a file truncated by a crash does not wedge later writes. Writers to the same namespace are serialized by a
//! per-namespace async mutex; readers never take it and always see either
//! the old or the new file.
//!
//! **Limitations:**
//! - Single process only: the mutex does not protect against another
//!   process writing the same directory.
//! - Rewrite cost grows with the namespace size.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::memory::{BackendKind, BackendStats, ContentType, MemoryRecord, MemoryValue};
use crate::domain::repository::{MemoryBackend, RepositoryError};

const NAMESPACE_FILE_EXT: &str = "json";
const PROBE_FILE: &str = ".conclave-storage-test";

/// On-disk shape of one record inside a namespace file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    content_type: ContentType,
    value: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

type NamespaceDocument = BTreeMap<String, StoredRecord>;

pub struct FileMemoryBackend {
    data_dir: PathBuf,
    writers: DashMap<String, Arc<Mutex<()>>>,
}

impl FileMemoryBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            writers: DashMap::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", namespace, NAMESPACE_FILE_EXT))
    }

    fn writer_for(&self, namespace: &str) -> Arc<Mutex<()>> {
        self.writers
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, namespace: &str) -> Result<NamespaceDocument, RepositoryError> {
        load_document(&self.namespace_path(namespace)).await
    }

    async fn store(&self, namespace: &str, document: &NamespaceDocument) -> Result<(), RepositoryError> {
        let path = self.namespace_path(namespace);
        let tmp = path.with_extension(format!("{}.tmp", NAMESPACE_FILE_EXT));
        let bytes = serde_json::to_vec_pretty(document)?;

        let write_err =
            |e: std::io::Error| RepositoryError::Io(format!("Failed to write {}: {}", tmp.display(), e));
        let mut file = tokio::fs::File::create(&tmp).await.map_err(write_err)?;
        file.write_all(&bytes).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            RepositoryError::Io(format!("Failed to replace {}: {}", path.display(), e))
        })?;

        // The new file is already visible; only its durability is in doubt.
        if let Err(e) = sync_dir(&self.data_dir).await {
            warn!("Failed to sync data directory {}: {}", self.data_dir.display(), e);
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

async fn load_document(path: &Path) -> Result<NamespaceDocument, RepositoryError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
            warn!("Namespace file {} is empty; treating it as an empty namespace", path.display());
            Ok(NamespaceDocument::new())
        }
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NamespaceDocument::new()),
        Err(e) => Err(RepositoryError::Io(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn into_record(namespace: &str, key: &str, stored: StoredRecord) -> Result<MemoryRecord, RepositoryError> {
    let value = MemoryValue::from_parts(stored.content_type, stored.value)?;
    Ok(MemoryRecord::new(namespace, key, value, stored.created_at, stored.updated_at))
}

#[async_trait]
impl MemoryBackend for FileMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::File
    }

    async fn connect(&self) -> bool {
        if let Err(e) = tokio::fs::create_dir_all(&self.data_dir).await {
            warn!("Failed to create data directory {}: {}", self.data_dir.display(), e);
            return false;
        }

        // Verify directory is writable
        let probe = self.data_dir.join(PROBE_FILE);
        if let Err(e) = tokio::fs::write(&probe, b"probe").await {
            warn!("Data directory {} is not writable: {}", self.data_dir.display(), e);
            return false;
        }
        if let Err(e) = tokio::fs::remove_file(&probe).await {
            warn!("Failed to clean up probe file: {}", e);
        }
        true
    }

    async fn read(&self, namespace: &str, key: &str) -> Option<MemoryRecord> {
        let mut document = match self.load(namespace).await {
            Ok(document) => document,
            Err(e) => {
                warn!(namespace, key, "Read failed: {}", e);
                return None;
            }
        };

        let stored = document.remove(key)?;
        match into_record(namespace, key, stored) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(namespace, key, "Discarding unreadable record: {}", e);
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
        let writer = self.writer_for(namespace);
        let _guard = writer.lock().await;

        let mut document = self.load(namespace).await?;
        let (content_type, raw) = value.to_parts();
        let now = Utc::now();
        let created_at = document.get(key).map(|r| r.created_at).unwrap_or(now);

        document.insert(
            key.to_string(),
            StoredRecord {
                content_type,
                value: raw,
                created_at,
                updated_at: now,
            },
        );
        self.store(namespace, &document).await?;

        debug!(namespace, key, "Record upserted");
        Ok(MemoryRecord::new(namespace, key, value.clone(), created_at, now))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, RepositoryError> {
        let writer = self.writer_for(namespace);
        let _guard = writer.lock().await;

        let mut document = self.load(namespace).await?;
        if document.remove(key).is_none() {
            return Ok(false);
        }
        self.store(namespace, &document).await?;
        Ok(true)
    }

    async fn list(&self, namespace: &str, prefix: &str) -> Vec<String> {
        match self.load(namespace).await {
            Ok(document) => document
                .into_keys()
                .filter(|key| key.starts_with(prefix))
                .collect(),
            Err(e) => {
                warn!(namespace, prefix, "List failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn stats(&self) -> BackendStats {
        let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read data directory {}: {}", self.data_dir.display(), e);
                return BackendStats::disconnected(BackendKind::File);
            }
        };

        let mut namespaces = BTreeMap::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error while scanning data directory: {}", e);
                    break;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(NAMESPACE_FILE_EXT) {
                continue;
            }
            let Some(namespace) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match load_document(&path).await {
                Ok(document) => {
                    namespaces.insert(namespace.to_string(), document.len() as u64);
                }
                Err(e) => warn!(namespace, "Skipping unreadable namespace file: {}", e),
            }
        }

        BackendStats {
            backend: BackendKind::File,
            connected: true,
            total_records: namespaces.values().sum(),
            namespaces,
        }
    }
}
