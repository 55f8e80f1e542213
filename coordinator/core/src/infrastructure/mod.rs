// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure Layer
//!
//! Adapters for PostgreSQL, the local filesystem, git, and the in-process
//! event channel.

pub mod audit_file;
pub mod db;
pub mod event_bus;
pub mod repositories;
