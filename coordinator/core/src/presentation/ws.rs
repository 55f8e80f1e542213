// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! WebSocket subscriber endpoint.
//!
//! Each connection subscribes to the event bus as soon as the upgrade
//! completes, then forwards every published event as a JSON text frame.
//! Text frames received from the client are parsed as `InboundMessage` and
//! dispatched through the broadcaster; failures are answered with
//! `{"type": "error", "error": ...}` and the connection stays open.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::EventBroadcaster;
use crate::domain::events::{InboundMessage, RealtimeEvent};
use crate::infrastructure::event_bus::EventBusError;
use crate::presentation::api::{actor_from, AppState};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let actor = actor_from(&headers, "ws");
    let broadcaster = state.broadcaster.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster, actor))
}

async fn handle_socket(socket: WebSocket, broadcaster: EventBroadcaster, actor: String) {
    let mut events = broadcaster.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!(actor = %actor, subscribers = broadcaster.subscriber_count(), "Subscriber connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Some(frame) = event_frame(&event) else {
                        continue;
                    };
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                // Dropped events are not replayed.
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            },
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_text_frame(&broadcaster, text.as_str(), &actor).await {
                        if sender.send(Message::Text(reply.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket receive error: {}", e);
                    break;
                }
            },
        }
    }

    info!(actor = %actor, "Subscriber disconnected");
}

/// Outbound text frame for one bus event.
fn event_frame(event: &RealtimeEvent) -> Option<String> {
    match serde_json::to_string(event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Handle one inbound text frame. Returns the error frame to send back, if any.
pub async fn handle_text_frame(
    broadcaster: &EventBroadcaster,
    text: &str,
    actor: &str,
) -> Option<Value> {
    let message: InboundMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            return Some(json!({ "type": "error", "error": format!("invalid message: {}", e) }))
        }
    };

    match broadcaster.handle_inbound(message, actor).await {
        Ok(outcome) => {
            debug!(?outcome, "Inbound message applied");
            None
        }
        Err(e) => Some(json!({ "type": "error", "error": e.to_string() })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::CoordinationFacade;
    use crate::domain::config::CoordinatorConfig;
    use crate::domain::memory::MemoryValue;
    use crate::domain::session::TriggerStatus;
    use tempfile::TempDir;

    async fn setup(dir: &TempDir) -> (CoordinationFacade, EventBroadcaster) {
        let mut config = CoordinatorConfig::default();
        config.storage.database_url = None;
        config.storage.data_dir = dir.path().join("data");
        config.audit.logs_dir = dir.path().join("logs");
        config.audit.git_commit = false;
        let (facade, _worker) = CoordinationFacade::from_config(&config).await.unwrap();
        let broadcaster = EventBroadcaster::new(facade.clone());
        (facade, broadcaster)
    }

    fn assert_error_frame(reply: Option<Value>) {
        let reply = reply.expect("an error frame");
        assert_eq!(reply["type"], json!("error"));
        assert!(reply["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_malformed_frames_get_error_reply() {
        let dir = TempDir::new().unwrap();
        let (_facade, broadcaster) = setup(&dir).await;

        assert_error_frame(handle_text_frame(&broadcaster, "{not json", "ws").await);
        assert_error_frame(handle_text_frame(&broadcaster, r#"{"type":"shout"}"#, "ws").await);
        assert_error_frame(
            handle_text_frame(&broadcaster, r#"{"type":"memory_update","namespace":"ns"}"#, "ws").await,
        );
    }

    #[tokio::test]
    async fn test_rejected_messages_get_error_reply() {
        let dir = TempDir::new().unwrap();
        let (_facade, broadcaster) = setup(&dir).await;

        let bad_namespace = r#"{"type":"memory_update","namespace":".hidden","key":"k","data":"v"}"#;
        assert_error_frame(handle_text_frame(&broadcaster, bad_namespace, "ws").await);

        let unknown_session = json!({
            "type": "agent_response",
            "sessionId": crate::domain::session::SessionId::new().to_string(),
            "data": {"status": "completed"}
        });
        assert_error_frame(handle_text_frame(&broadcaster, &unknown_session.to_string(), "ws").await);
    }

    #[tokio::test]
    async fn test_memory_update_frame_writes_through_facade() {
        let dir = TempDir::new().unwrap();
        let (facade, broadcaster) = setup(&dir).await;

        let frame = r#"{"type":"memory_update","namespace":"agents","key":"planner","data":{"step":2}}"#;
        assert!(handle_text_frame(&broadcaster, frame, "ws-client").await.is_none());

        let record = facade.read("agents", "planner").await.unwrap().unwrap();
        assert_eq!(record.value, MemoryValue::Structured(json!({"step": 2})));
        let audit = facade.recent_audit(Some("agents"), 10).await.unwrap();
        assert_eq!(audit[0].actor, "ws-client");
    }

    #[tokio::test]
    async fn test_agent_response_frame_updates_session() {
        let dir = TempDir::new().unwrap();
        let (_facade, broadcaster) = setup(&dir).await;
        let id = broadcaster.trigger("sonnet", json!({}), "t").await.unwrap();

        let frame = json!({
            "type": "agent_response",
            "sessionId": id.to_string(),
            "data": {"status": "failed", "reason": "timeout"}
        });
        assert!(handle_text_frame(&broadcaster, &frame.to_string(), "agent").await.is_none());

        let session = broadcaster.session(&id.to_string()).await.unwrap();
        assert_eq!(session.status, TriggerStatus::Failed);
        assert_eq!(session.response.unwrap()["reason"], json!("timeout"));
    }

    #[tokio::test]
    async fn test_subscriber_receives_trigger_frame() {
        let dir = TempDir::new().unwrap();
        let (_facade, broadcaster) = setup(&dir).await;
        let mut events = broadcaster.subscribe();

        let id = broadcaster.trigger("sonnet", json!({"prompt": "hi"}), "t").await.unwrap();

        let mut trigger_frame = None;
        while let Ok(event) = events.try_recv() {
            let frame: Value = serde_json::from_str(&event_frame(&event).unwrap()).unwrap();
            if frame["type"] == json!("trigger") {
                trigger_frame = Some(frame);
            }
        }
        let frame = trigger_frame.expect("a trigger frame");
        assert_eq!(frame["data"]["sessionId"], json!(id.to_string()));
        assert_eq!(frame["data"]["input"]["prompt"], json!("hi"));
    }
}
