// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for Conclave CLI

pub mod config;
pub mod health;
pub mod memory;

pub use self::config::ConfigCommand;
pub use self::memory::MemoryCommand;
