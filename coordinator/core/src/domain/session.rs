// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Trigger Sessions
//!
//! A `TriggerEvent` is created when a caller asks an agent to start work.
//! It is persisted under the `sessions` namespace, broadcast to connected
//! subscribers, and later updated in place as the agent reports progress.
//!
//! Status lifecycle: `pending → processing → completed | failed`.
//! `completed` and `failed` are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::error::CoordinationError;

/// Namespace holding one record per trigger session.
pub const SESSIONS_NAMESPACE: &str = "sessions";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self, CoordinationError> {
        Uuid::parse_str(value)
            .map(SessionId)
            .map_err(|e| CoordinationError::validation("sessionId", e.to_string()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TriggerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TriggerStatus::Completed | TriggerStatus::Failed)
    }

    /// Forward-only transitions. Re-reporting `processing` is allowed so
    /// agents can stream progress.
    pub fn can_transition_to(&self, next: TriggerStatus) -> bool {
        use TriggerStatus::*;
        match (self, next) {
            (Pending, Processing | Completed | Failed) => true,
            (Processing, Processing | Completed | Failed) => true,
            _ => false,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TriggerStatus::Pending),
            "processing" => Some(TriggerStatus::Processing),
            "completed" => Some(TriggerStatus::Completed),
            "failed" => Some(TriggerStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerStatus::Pending => "pending",
            TriggerStatus::Processing => "processing",
            TriggerStatus::Completed => "completed",
            TriggerStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub session_id: SessionId,
    pub target_agent: String,
    pub input: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub status: TriggerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn new(target_agent: impl Into<String>, input: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::new(),
            target_agent: target_agent.into(),
            input,
            timestamp: now,
            status: TriggerStatus::Pending,
            response: None,
            updated_at: now,
        }
    }

    /// Apply an agent's status report.
    pub fn apply_response(
        &mut self,
        status: TriggerStatus,
        response: Option<serde_json::Value>,
    ) -> Result<(), CoordinationError> {
        if !self.status.can_transition_to(status) {
            return Err(CoordinationError::validation(
                "status",
                format!(
                    "session {} cannot move from {} to {}",
                    self.session_id, self.status, status
                ),
            ));
        }

        self.status = status;
        if response.is_some() {
            self.response = response;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event_is_pending() {
        let event = TriggerEvent::new("sonnet", json!({"prompt": "hi"}));
        assert_eq!(event.status, TriggerStatus::Pending);
        assert!(event.response.is_none());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let event = TriggerEvent::new("sonnet", json!("go"));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["sessionId"], json!(event.session_id.to_string()));
        assert_eq!(value["targetAgent"], json!("sonnet"));
        assert_eq!(value["status"], json!("pending"));
        assert!(value.get("response").is_none());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut event = TriggerEvent::new("sonnet", json!(null));
        event.apply_response(TriggerStatus::Processing, None).unwrap();
        event.apply_response(TriggerStatus::Processing, Some(json!({"progress": 50}))).unwrap();
        event.apply_response(TriggerStatus::Completed, Some(json!({"output": "done"}))).unwrap();
        assert_eq!(event.response, Some(json!({"output": "done"})));

        let err = event.apply_response(TriggerStatus::Processing, None).unwrap_err();
        assert!(matches!(err, CoordinationError::Validation { .. }));
    }

    #[test]
    fn test_cannot_return_to_pending() {
        let mut event = TriggerEvent::new("sonnet", json!(null));
        assert!(event.apply_response(TriggerStatus::Pending, None).is_err());
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        assert_eq!(SessionId::parse(&id.to_string()).unwrap(), id);
        assert!(SessionId::parse("not-a-uuid").is_err());
    }
}
