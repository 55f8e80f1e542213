// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! PostgreSQL backend tests.
//!
//! Run only when `CONCLAVE_TEST_DATABASE_URL` points at a disposable
//! database; otherwise each test returns immediately.

use conclave_core::application::backend_factory::create_postgres_backend;
use conclave_core::domain::lock::Lock;
use conclave_core::domain::repository::PostgresConfig;
use conclave_core::{BackendKind, MemoryValue};
use chrono::Utc;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

fn database_url() -> Option<String> {
    std::env::var("CONCLAVE_TEST_DATABASE_URL").ok().filter(|url| !url.is_empty())
}

/// Namespace unique to one test run so parallel runs do not collide.
fn scratch_namespace(label: &str) -> String {
    format!("test-{}-{}", label, Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_postgres_records_round_trip() {
    let Some(url) = database_url() else { return };
    let selected = create_postgres_backend(&PostgresConfig {
        connection_string: url,
        max_connections: 2,
    })
    .await
    .unwrap();
    assert_eq!(selected.kind(), BackendKind::Postgres);

    let ns = scratch_namespace("records");
    let backend = selected.backend;

    backend.write(&ns, "text", &MemoryValue::Text("hi".into())).await.unwrap();
    backend.write(&ns, "doc", &MemoryValue::Structured(json!({"a": 1}))).await.unwrap();
    backend.write(&ns, "doc", &MemoryValue::Structured(json!({"a": 2}))).await.unwrap();
    backend.write(&ns, "under_score", &MemoryValue::Text("x".into())).await.unwrap();

    assert_eq!(
        backend.read(&ns, "text").await.unwrap().value,
        MemoryValue::Text("hi".into())
    );
    assert_eq!(
        backend.read(&ns, "doc").await.unwrap().value,
        MemoryValue::Structured(json!({"a": 2}))
    );

    // `_` is a LIKE wildcard and must match literally.
    assert_eq!(backend.list(&ns, "under_").await, vec!["under_score".to_string()]);
    assert!(backend.list(&ns, "under%").await.is_empty());

    assert!(backend.delete(&ns, "doc").await.unwrap());
    assert!(!backend.delete(&ns, "doc").await.unwrap());
    for key in ["text", "under_score"] {
        backend.delete(&ns, key).await.unwrap();
    }
}

#[tokio::test]
async fn test_postgres_lease_exclusion() {
    let Some(url) = database_url() else { return };
    let selected = create_postgres_backend(&PostgresConfig {
        connection_string: url,
        max_connections: 2,
    })
    .await
    .unwrap();

    let ns = scratch_namespace("locks");
    let now = Utc::now();
    let first = Lock::starting_at(&ns, "k", "a", Duration::from_millis(100), now);
    let second = Lock::starting_at(&ns, "k", "b", Duration::from_millis(100), now);

    assert!(selected.locks.try_insert(&first).await.unwrap());
    assert!(!selected.locks.try_insert(&second).await.unwrap());

    tokio::time::sleep(Duration::from_millis(150)).await;
    selected.locks.purge_expired(Utc::now()).await.unwrap();
    assert!(selected.locks.try_insert(&second).await.unwrap());
    selected.locks.remove(&ns, "k").await.unwrap();
}
