// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod audit;
pub mod config;
pub mod error;
pub mod events;
pub mod lock;
pub mod memory;
pub mod repository;
pub mod session;
pub mod validation;

pub use error::{AuditWriteError, CoordinationError};
pub use memory::{BackendKind, BackendStats, ContentType, MemoryRecord, MemoryValue};
