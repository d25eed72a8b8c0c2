//! Recording executions into a JSONL history file.

use super::Fixture;
use rest_workbench::api::ExecuteRequestBody;
use rest_workbench::history::{HistoryConfig, HistoryCorrection, JsonlHistoryStore};
use rest_workbench::models::HttpMethod;
use rest_workbench::{HistoryRecorder, RequestDefinition};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_executions_are_recorded_and_cascade_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fine"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonlHistoryStore::new(
        dir.path().join("history.jsonl"),
        HistoryConfig::default(),
    ));
    let fixture = Fixture::new();
    let workbench = fixture
        .workbench
        .clone()
        .with_history(store.clone())
        .with_recording(true);

    let mut def = RequestDefinition::new("ok", HttpMethod::GET, format!("{}/ok", server.uri()));
    def.collection_id = Some("col-1".to_string());
    def.workspace_id = Some("ws-1".to_string());
    def.add_header("Authorization", "Bearer secret");
    let id = fixture.store(def);

    for _ in 0..3 {
        workbench
            .execute_request(&id, ExecuteRequestBody::default())
            .await
            .unwrap();
    }

    let entries = store.list_by_request(&id).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.response_status_code == Some(200)));
    assert_eq!(entries[0].request_headers["Authorization"], "[REDACTED]");
    assert_eq!(store.list_by_workspace("ws-1").unwrap().len(), 3);

    assert_eq!(store.delete_by_collection("col-1").unwrap(), 3);
    assert!(store.list_recent(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_execution_is_recorded_with_error() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonlHistoryStore::new(
        dir.path().join("history.jsonl"),
        HistoryConfig::default(),
    ));
    let fixture = Fixture::new();
    let workbench = fixture
        .workbench
        .clone()
        .with_history(store.clone())
        .with_recording(true);
    let id = fixture.store(RequestDefinition::new(
        "down",
        HttpMethod::GET,
        "http://127.0.0.1:1/down",
    ));

    workbench
        .execute_request(&id, ExecuteRequestBody::default())
        .await
        .unwrap();

    let entries = store.list_recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_error());
    assert!(entries[0].response_status_code.is_none());
    assert!(entries[0].error.is_some());

    let corrected = store
        .update(
            &entries[0].id,
            HistoryCorrection {
                response_status_code: Some(503),
                ..HistoryCorrection::default()
            },
        )
        .unwrap();
    assert_eq!(corrected.response_status_code, Some(503));

    let rejected = store.update(
        &entries[0].id,
        HistoryCorrection {
            response_status_code: Some(42),
            ..HistoryCorrection::default()
        },
    );
    assert!(rejected.is_err());
}
