// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP adapter tests driven through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use conclave_core::application::CoordinationFacade;
use conclave_core::domain::config::CoordinatorConfig;
use conclave_core::presentation::app;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn router(dir: &TempDir) -> (Router, CoordinationFacade) {
    let mut config = CoordinatorConfig::default();
    config.storage.database_url = None;
    config.storage.data_dir = dir.path().join("data");
    config.audit.logs_dir = dir.path().join("logs");
    config.audit.git_commit = false;
    let (facade, _worker) = CoordinationFacade::from_config(&config).await.unwrap();
    (app(facade.clone()), facade)
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri).header("x-actor", "api-test");
    let body = match body {
        Some(body) => {
            request = request.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn test_write_then_read_over_http() {
    let dir = TempDir::new().unwrap();
    let (router, _facade) = router(&dir).await;

    let (status, body) = call(&router, Method::POST, "/memory/agents/doc", Some(json!({"data": {"a": 1}}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));

    let (status, body) = call(&router, Method::GET, "/memory/agents/doc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"a": 1}));

    call(&router, Method::POST, "/memory/agents/note", Some(json!({"data": "hello"}))).await;
    let (_, body) = call(&router, Method::GET, "/memory/agents/note", None).await;
    assert_eq!(body["data"], json!("hello"));
}

#[tokio::test]
async fn test_absent_key_reads_null() {
    let dir = TempDir::new().unwrap();
    let (router, _facade) = router(&dir).await;

    let (status, body) = call(&router, Method::GET, "/memory/agents/missing", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": null}));
}

#[tokio::test]
async fn test_invalid_key_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let (router, _facade) = router(&dir).await;

    let (status, body) = call(&router, Method::POST, "/memory/agents/.hidden", Some(json!({"data": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_held_lease_is_conflict() {
    let dir = TempDir::new().unwrap();
    let (router, facade) = router(&dir).await;
    assert!(facade.acquire_lock("agents", "busy", None, "someone").await.unwrap());

    let (status, body) = call(&router, Method::POST, "/memory/agents/busy", Some(json!({"data": 1}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("agents/busy"));
}

#[tokio::test]
async fn test_delete_list_and_audit_routes() {
    let dir = TempDir::new().unwrap();
    let (router, _facade) = router(&dir).await;

    for key in ["task-1", "task-2", "note"] {
        call(&router, Method::POST, &format!("/memory/work/{}", key), Some(json!({"data": key}))).await;
    }

    let (_, body) = call(&router, Method::GET, "/memory/work?prefix=task-", None).await;
    assert_eq!(body["keys"], json!(["task-1", "task-2"]));

    let (_, body) = call(&router, Method::DELETE, "/memory/work/task-1", None).await;
    assert_eq!(body, json!({"success": true, "deleted": true}));
    let (_, body) = call(&router, Method::DELETE, "/memory/work/task-1", None).await;
    assert_eq!(body["deleted"], json!(false));

    let (status, body) = call(&router, Method::GET, "/audit/work?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["operation"], json!("delete"));
    assert_eq!(entries[0]["actor"], json!("api-test"));
}

#[tokio::test]
async fn test_trigger_and_poll_session() {
    let dir = TempDir::new().unwrap();
    let (router, _facade) = router(&dir).await;

    let (status, body) = call(&router, Method::POST, "/agents/sonnet/trigger", Some(json!({"input": {"prompt": "hi"}}))).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let (status, body) = call(&router, Method::GET, &format!("/sessions/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("pending"));
    assert_eq!(body["data"]["targetAgent"], json!("sonnet"));

    let (status, _) = call(&router, Method::GET, "/sessions/00000000-0000-4000-8000-000000000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_backend() {
    let dir = TempDir::new().unwrap();
    let (router, _facade) = router(&dir).await;

    let (status, body) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], json!(true));
    assert_eq!(body["backend"], json!("file"));
    assert_eq!(body["activeLocks"], json!(0));
}
