// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Audit Logger Application Service
//!
//! Records one `AuditEntry` per committed mutation into two independent
//! sinks:
//!
//! 1. the queryable log (`AuditRepository`), written inline and mirrored as
//!    a structured `tracing` event;
//! 2. the flat-file sink (`FlatFileAuditSink`), written by a single
//!    background worker fed through a bounded in-order queue.
//!
//! Sequence assignment, the queryable append and the enqueue happen under
//! one async mutex, so both sinks observe entries in sequence order.
//! Failures in either sink are logged and never reach the caller. When the
//! worker falls behind and the queue is full, the flat-file copy of an entry
//! is dropped and counted; the queryable log still has it.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::audit::{truncate_preview, AuditEntry, AuditOperation, PREVIEW_MAX_CHARS};
use crate::domain::error::{AuditWriteError, CoordinationError};
use crate::domain::memory::MemoryValue;
use crate::domain::repository::AuditRepository;
use crate::infrastructure::audit_file::FlatFileAuditSink;

enum AuditCommand {
    Append(AuditEntry),
    Flush(oneshot::Sender<()>),
}

pub struct AuditLogger {
    repository: Arc<dyn AuditRepository>,
    queue: mpsc::Sender<AuditCommand>,
    sequence: Mutex<u64>,
    dropped: AtomicU64,
}

impl AuditLogger {
    /// Build the logger and spawn its flat-file worker.
    ///
    /// At most `queue_capacity` entries wait for the worker. The worker
    /// exits once the logger is dropped and its queue drained.
    pub fn start(
        repository: Arc<dyn AuditRepository>,
        sink: FlatFileAuditSink,
        queue_capacity: usize,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let (queue, receiver) = mpsc::channel(queue_capacity.max(1));
        let logger = Arc::new(Self {
            repository,
            queue,
            sequence: Mutex::new(0),
            dropped: AtomicU64::new(0),
        });
        let worker = tokio::spawn(run_worker(receiver, Arc::new(sink)));
        (logger, worker)
    }

    /// Record a committed mutation. `value` is the written payload, if any.
    pub async fn record(
        &self,
        namespace: &str,
        key: &str,
        operation: AuditOperation,
        actor: &str,
        value: Option<&MemoryValue>,
    ) -> AuditEntry {
        let preview = value
            .map(|v| truncate_preview(&v.render(), PREVIEW_MAX_CHARS))
            .unwrap_or_default();

        let mut sequence = self.sequence.lock().await;
        *sequence += 1;
        let entry = AuditEntry {
            sequence: *sequence,
            timestamp: Utc::now(),
            namespace: namespace.to_string(),
            key: key.to_string(),
            operation,
            actor: actor.to_string(),
            preview,
        };

        if let Err(e) = self.repository.append(&entry).await {
            error!(
                sequence = entry.sequence,
                error = %AuditWriteError::from(e),
                "Failed to append audit entry to queryable log"
            );
        }
        info!(
            target: "conclave::audit",
            sequence = entry.sequence,
            namespace = %entry.namespace,
            key = %entry.key,
            operation = %entry.operation,
            actor = %entry.actor,
            "Memory mutation recorded"
        );

        match self.queue.try_send(AuditCommand::Append(entry.clone())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    sequence = entry.sequence,
                    dropped,
                    "Audit file queue full; flat-file entry dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                warn!(sequence = entry.sequence, "Audit worker stopped; flat-file entry dropped");
            }
        }
        drop(sequence);

        entry
    }

    /// Wait until every entry queued so far has reached the flat-file sink.
    pub async fn flush(&self) -> Result<(), AuditWriteError> {
        let (done, wait) = oneshot::channel();
        self.queue
            .send(AuditCommand::Flush(done))
            .await
            .map_err(|_| AuditWriteError::Task("audit worker is not running".to_string()))?;
        wait.await
            .map_err(|_| AuditWriteError::Task("audit worker exited before flush".to_string()))
    }

    /// Newest entries first, optionally for one namespace.
    pub async fn recent(
        &self,
        namespace: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, CoordinationError> {
        Ok(self.repository.recent(namespace, limit).await?)
    }

    /// Entries that never reached the flat-file sink because its queue was full.
    pub fn dropped_entries(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Highest sequence number handed out so far.
    pub async fn last_sequence(&self) -> u64 {
        *self.sequence.lock().await
    }
}

async fn run_worker(mut receiver: mpsc::Receiver<AuditCommand>, sink: Arc<FlatFileAuditSink>) {
    info!(logs_dir = %sink.logs_dir().display(), "Starting audit file worker");
    let mut entries_processed = 0u64;
    let mut errors_encountered = 0u64;

    while let Some(command) = receiver.recv().await {
        match command {
            AuditCommand::Append(entry) => {
                entries_processed += 1;
                let sequence = entry.sequence;
                let task_sink = sink.clone();
                let result = tokio::task::spawn_blocking(move || task_sink.append(&entry))
                    .await
                    .map_err(|e| AuditWriteError::Task(e.to_string()))
                    .and_then(|inner| inner);

                if let Err(e) = result {
                    errors_encountered += 1;
                    error!(sequence, error = %e, "Failed to write audit entry to flat file");

                    // Log warning every 10 errors to avoid spam
                    if errors_encountered % 10 == 0 {
                        warn!("Audit file sink has failed {} times", errors_encountered);
                    }
                }

                if entries_processed % 100 == 0 {
                    debug!(
                        "Audit worker processed {} entries ({} errors)",
                        entries_processed, errors_encountered
                    );
                }
            }
            AuditCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    info!(
        "Audit file worker shut down (processed {} entries, {} errors)",
        entries_processed, errors_encountered
    );
}
