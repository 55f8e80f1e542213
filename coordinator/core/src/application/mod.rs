// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod audit_logger;
pub mod backend_factory;
pub mod broadcaster;
pub mod coordination;
pub mod lock_manager;

pub use broadcaster::EventBroadcaster;
pub use coordination::{CoordinationFacade, HealthReport};
