// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Event Broadcaster Application Service
//!
//! Turns trigger requests into persisted sessions and fans them out to the
//! subscribers connected at that moment. Inbound subscriber messages are
//! routed back through the coordination facade so they take the same lease
//! and audit path as HTTP writes.

use serde_json::Value;
use tracing::info;

use crate::application::coordination::CoordinationFacade;
use crate::domain::error::CoordinationError;
use crate::domain::events::{InboundMessage, RealtimeEvent};
use crate::domain::memory::MemoryValue;
use crate::domain::session::{SessionId, TriggerEvent, TriggerStatus, SESSIONS_NAMESPACE};
use crate::domain::validation::validate_identifier;
use crate::infrastructure::event_bus::{EventBus, EventReceiver};

/// Status assumed when an agent response omits one.
const DEFAULT_RESPONSE_STATUS: TriggerStatus = TriggerStatus::Completed;
const MAX_AGENT_NAME_LEN: usize = 64;

/// What an inbound message resulted in.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    MemoryWritten { namespace: String, key: String },
    SessionUpdated(TriggerEvent),
}

#[derive(Clone)]
pub struct EventBroadcaster {
    facade: CoordinationFacade,
    events: EventBus,
}

impl EventBroadcaster {
    pub fn new(facade: CoordinationFacade) -> Self {
        let events = facade.events().clone();
        Self { facade, events }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    /// Create a pending session for `agent`, persist it, then deliver it to
    /// every connected subscriber. Returns the new session id.
    pub async fn trigger(
        &self,
        agent: &str,
        input: Value,
        actor: &str,
    ) -> Result<SessionId, CoordinationError> {
        validate_identifier("agent", agent, MAX_AGENT_NAME_LEN)?;

        let event = TriggerEvent::new(agent, input);
        let session_id = event.session_id;
        self.persist(&event, actor).await?;

        let delivered = self.events.publish(RealtimeEvent::Trigger { data: event });
        info!(session_id = %session_id, agent, delivered, "Agent triggered");
        Ok(session_id)
    }

    /// Current state of a session.
    pub async fn session(&self, session_id: &str) -> Result<TriggerEvent, CoordinationError> {
        let id = SessionId::parse(session_id)?;
        let record = self
            .facade
            .read(SESSIONS_NAMESPACE, &id.to_string())
            .await?
            .ok_or_else(|| CoordinationError::NotFound(format!("session {}", id)))?;

        Ok(serde_json::from_value(record.value.to_json())?)
    }

    /// Apply an agent's status report to its session and broadcast the result.
    ///
    /// `data.status` selects the next status (`completed` when absent); the
    /// whole `data` object is kept as the response payload. The transition
    /// is checked and stored under the session's lease, so a finished
    /// session cannot be overwritten by a concurrent response.
    pub async fn record_agent_response(
        &self,
        session_id: &str,
        data: Value,
        actor: &str,
    ) -> Result<TriggerEvent, CoordinationError> {
        let status = match data.get("status") {
            None | Some(Value::Null) => DEFAULT_RESPONSE_STATUS,
            Some(Value::String(s)) => TriggerStatus::parse(s).ok_or_else(|| {
                CoordinationError::validation("status", format!("unknown status '{}'", s))
            })?,
            Some(other) => {
                return Err(CoordinationError::validation(
                    "status",
                    format!("expected a string, got {}", other),
                ))
            }
        };

        let id = SessionId::parse(session_id)?;
        let response = if data.is_null() { None } else { Some(data) };
        let record = self
            .facade
            .update(SESSIONS_NAMESPACE, &id.to_string(), actor, move |current| {
                let record =
                    current.ok_or_else(|| CoordinationError::NotFound(format!("session {}", id)))?;
                let mut event: TriggerEvent = serde_json::from_value(record.value.to_json())?;
                event.apply_response(status, response)?;
                Ok(MemoryValue::Structured(serde_json::to_value(&event)?))
            })
            .await?;
        let event: TriggerEvent = serde_json::from_value(record.value.to_json())?;

        self.events.publish(RealtimeEvent::SessionUpdated { data: event.clone() });
        info!(session_id = %event.session_id, status = %event.status, "Session updated");
        Ok(event)
    }

    /// Dispatch one message received from a subscriber.
    pub async fn handle_inbound(
        &self,
        message: InboundMessage,
        actor: &str,
    ) -> Result<InboundOutcome, CoordinationError> {
        match message {
            InboundMessage::MemoryUpdate { namespace, key, data } => {
                self.facade.write(&namespace, &key, data, actor).await?;
                Ok(InboundOutcome::MemoryWritten { namespace, key })
            }
            InboundMessage::AgentResponse { session_id, data } => {
                let event = self.record_agent_response(&session_id, data, actor).await?;
                Ok(InboundOutcome::SessionUpdated(event))
            }
        }
    }

    async fn persist(&self, event: &TriggerEvent, actor: &str) -> Result<(), CoordinationError> {
        let value = MemoryValue::Structured(serde_json::to_value(event)?);
        self.facade
            .write(SESSIONS_NAMESPACE, &event.session_id.to_string(), value, actor)
            .await?;
        Ok(())
    }
}
