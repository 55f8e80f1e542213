// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Conclave Core
//!
//! Coordination memory store shared by cooperating agents: namespaced
//! records, non-blocking leases, an append-only audit trail and a real-time
//! event fan-out.
//!
//! # Architecture
//!
//! - **Domain:** records, leases, audit entries, trigger sessions, repository traits
//! - **Application:** lock manager, audit logger, coordination facade, broadcaster
//! - **Infrastructure:** PostgreSQL and file backends, event bus, flat-file audit sink
//! - **Presentation:** thin axum adapter (HTTP + WebSocket)

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
