// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Real-time Messages
//!
//! Frames exchanged over the persistent subscriber connection.
//!
//! Outbound (`RealtimeEvent`):
//! - `{"type": "trigger", "data": TriggerEvent}`
//! - `{"type": "memory_updated", "namespace", "key", "operation", "actor"}`
//! - `{"type": "session_updated", "data": TriggerEvent}`
//!
//! Inbound (`InboundMessage`):
//! - `{"type": "memory_update", "namespace", "key", "data"}`
//! - `{"type": "agent_response", "sessionId", "data"}`

use serde::{Deserialize, Serialize};

use crate::domain::audit::AuditOperation;
use crate::domain::memory::MemoryValue;
use crate::domain::session::TriggerEvent;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    Trigger {
        data: TriggerEvent,
    },
    MemoryUpdated {
        namespace: String,
        key: String,
        operation: AuditOperation,
        actor: String,
    },
    SessionUpdated {
        data: TriggerEvent,
    },
}

impl RealtimeEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            RealtimeEvent::Trigger { .. } => "trigger",
            RealtimeEvent::MemoryUpdated { .. } => "memory_updated",
            RealtimeEvent::SessionUpdated { .. } => "session_updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    MemoryUpdate {
        namespace: String,
        key: String,
        data: MemoryValue,
    },
    AgentResponse {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_frame_shape() {
        let event = TriggerEvent::new("sonnet", json!({"prompt": "x"}));
        let frame = serde_json::to_value(RealtimeEvent::Trigger { data: event.clone() }).unwrap();
        assert_eq!(frame["type"], json!("trigger"));
        assert_eq!(frame["data"]["sessionId"], json!(event.session_id.to_string()));
    }

    #[test]
    fn test_parse_memory_update() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "type": "memory_update",
            "namespace": "agents",
            "key": "k1",
            "data": {"a": 1}
        }))
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::MemoryUpdate {
                namespace: "agents".into(),
                key: "k1".into(),
                data: MemoryValue::Structured(json!({"a": 1})),
            }
        );
    }

    #[test]
    fn test_parse_agent_response() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "type": "agent_response",
            "sessionId": "abc",
            "data": {"status": "completed"}
        }))
        .unwrap();
        match msg {
            InboundMessage::AgentResponse { session_id, data } => {
                assert_eq!(session_id, "abc");
                assert_eq!(data["status"], json!("completed"));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let parsed: Result<InboundMessage, _> =
            serde_json::from_value(json!({"type": "shutdown"}));
        assert!(parsed.is_err());
    }
}
