// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Flat-file audit sink
//!
//! Appends one NDJSON line per entry to `<logs_dir>/<namespace>/<key>.ndjson`
//! and, when enabled, commits that file to a git repository rooted at
//! `logs_dir` (initialised on first use). One commit per entry, message
//! `feat(<namespace>): <operation> on <key>`.
//!
//! All methods are blocking. The audit worker calls them from
//! `tokio::task::spawn_blocking`, one entry at a time, so commits never race.

use git2::{ErrorCode, Repository, Signature};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::audit::AuditEntry;
use crate::domain::config::AuditConfig;
use crate::domain::error::AuditWriteError;

#[derive(Debug, Clone)]
pub struct FlatFileAuditSink {
    logs_dir: PathBuf,
    git_commit: bool,
    author_name: String,
    author_email: String,
}

impl FlatFileAuditSink {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            logs_dir: config.logs_dir.clone(),
            git_commit: config.git_commit,
            author_name: config.author_name.clone(),
            author_email: config.author_email.clone(),
        }
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Path of the entry's log file relative to `logs_dir`.
    pub fn relative_path(entry: &AuditEntry) -> PathBuf {
        Path::new(&entry.namespace).join(format!("{}.ndjson", entry.key))
    }

    /// Append `entry` and commit it. The append is durable even if the
    /// commit fails.
    pub fn append(&self, entry: &AuditEntry) -> Result<(), AuditWriteError> {
        let relative = Self::relative_path(entry);
        let path = self.logs_dir.join(&relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        if self.git_commit {
            self.commit(&relative, &entry.commit_message())?;
        }
        Ok(())
    }

    fn open_repository(&self) -> Result<Repository, AuditWriteError> {
        match Repository::open(&self.logs_dir) {
            Ok(repo) => Ok(repo),
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!("Initialising audit repository at {}", self.logs_dir.display());
                Ok(Repository::init(&self.logs_dir)?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn commit(&self, relative: &Path, message: &str) -> Result<(), AuditWriteError> {
        let repo = self.open_repository()?;

        let mut index = repo.index()?;
        index.add_path(relative)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let signature = Signature::now(&self.author_name, &self.author_email)?;
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        debug!(commit = %oid, "Audit entry committed");
        Ok(())
    }
}
