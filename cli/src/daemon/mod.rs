// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon mode implementation
//!
//! Handles:
//! - HTTP + WebSocket serving
//! - Graceful shutdown with audit flush

pub mod server;

pub use server::start_daemon;
