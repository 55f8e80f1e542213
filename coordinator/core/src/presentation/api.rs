// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP adapter over the coordination facade and event broadcaster.
//!
//! Every response body carries a `success` flag. Failures are mapped from
//! `CoordinationError` to a status code and `{"success": false, "error"}`.
//! The acting identity for audit entries is taken from the `x-actor`
//! header, or `http` when absent.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::application::{CoordinationFacade, EventBroadcaster};
use crate::domain::error::CoordinationError;
use crate::domain::memory::MemoryValue;
use crate::presentation::ws;

pub const ACTOR_HEADER: &str = "x-actor";
const DEFAULT_AUDIT_LIMIT: usize = 50;
const MAX_AUDIT_LIMIT: usize = 1000;

pub struct AppState {
    pub facade: CoordinationFacade,
    pub broadcaster: EventBroadcaster,
}

pub fn app(facade: CoordinationFacade) -> Router {
    let broadcaster = EventBroadcaster::new(facade.clone());
    let state = Arc::new(AppState { facade, broadcaster });

    Router::new()
        .route("/health", get(health_handler))
        .route("/memory/{namespace}", get(list_handler))
        .route(
            "/memory/{namespace}/{key}",
            get(read_handler).post(write_handler).delete(delete_handler),
        )
        .route("/audit/{namespace}", get(audit_handler))
        .route("/agents/{agent}/trigger", post(trigger_handler))
        .route("/sessions/{session_id}", get(session_handler))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `CoordinationError` rendered as an HTTP response.
pub struct ApiError(pub CoordinationError);

impl From<CoordinationError> for ApiError {
    fn from(err: CoordinationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoordinationError::Validation { .. } => StatusCode::BAD_REQUEST,
            CoordinationError::NotFound(_) => StatusCode::NOT_FOUND,
            CoordinationError::LockConflict { .. } => StatusCode::CONFLICT,
            CoordinationError::Connection(_) | CoordinationError::Persistence(_) => {
                error!(error = %self.0, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "success": false, "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

pub(crate) fn actor_from(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = state.facade.health().await;
    Json(json!({
        "success": true,
        "status": if report.connected { "healthy" } else { "degraded" },
        "connected": report.connected,
        "backend": report.backend,
        "stats": report.stats,
        "activeLocks": report.active_locks,
        "subscribers": report.subscribers,
    }))
}

async fn read_handler(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
) -> ApiResult {
    let record = state.facade.read(&namespace, &key).await?;
    Ok(Json(json!({
        "success": true,
        "data": record.map(|r| r.value.to_json()),
    })))
}

async fn write_handler(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<WriteRequest>,
) -> ApiResult {
    let actor = actor_from(&headers, "http");
    let value = MemoryValue::from_wire(body.data);
    state.facade.write(&namespace, &key, value, &actor).await?;
    Ok(Json(json!({ "success": true })))
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = actor_from(&headers, "http");
    let deleted = state.facade.delete(&namespace, &key, &actor).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

async fn list_handler(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult {
    let mut keys = state.facade.list(&namespace, &query.prefix).await?;
    keys.sort();
    Ok(Json(json!({ "success": true, "keys": keys })))
}

async fn audit_handler(
    State(state): State<Arc<AppState>>,
    Path(namespace): Path<String>,
    Query(query): Query<AuditQuery>,
) -> ApiResult {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(MAX_AUDIT_LIMIT);
    let entries = state.facade.recent_audit(Some(&namespace), limit).await?;
    Ok(Json(json!({ "success": true, "entries": entries })))
}

async fn trigger_handler(
    State(state): State<Arc<AppState>>,
    Path(agent): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TriggerRequest>,
) -> ApiResult {
    let actor = actor_from(&headers, "http");
    let session_id = state.broadcaster.trigger(&agent, body.input, &actor).await?;
    Ok(Json(json!({ "success": true, "sessionId": session_id })))
}

async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> ApiResult {
    let session = state.broadcaster.session(&session_id).await?;
    Ok(Json(json!({ "success": true, "data": session })))
}
