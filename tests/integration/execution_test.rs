//! End-to-end execution against a local HTTP server.

use super::Fixture;
use chrono::{Duration, Utc};
use rest_workbench::api::ExecuteRequestBody;
use rest_workbench::models::{AuthType, BodyType, FailureKind, HttpMethod};
use rest_workbench::{
    Environment, EnvironmentStore, ExecutionOverrides, InMemoryEnvironmentStore, NewEnvironment,
    RequestDefinition,
};
use serde_json::json;
use std::collections::HashMap;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn environment(id: &str, workspace: &str, minutes_ago: i64, base_url: &str) -> Environment {
    let created = Utc::now() - Duration::minutes(minutes_ago);
    Environment {
        id: id.to_string(),
        workspace_id: Some(workspace.to_string()),
        name: id.to_string(),
        variables: HashMap::from([("BASE_URL".to_string(), base_url.to_string())]),
        is_active: true,
        created_at: created,
        updated_at: created,
    }
}

#[tokio::test]
async fn test_execute_resolves_environment_variables() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/users/12345"))
        .and(query_param("api_key", "secret-key-123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"12345"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    let env = fixture
        .environments
        .create(
            NewEnvironment::new("dev")
                .with_variable("BASE_URL", server.uri())
                .with_variable("VERSION", "v2")
                .with_variable("USER_ID", "12345")
                .with_variable("API_KEY", "secret-key-123"),
        )
        .unwrap();
    let id = fixture.store(RequestDefinition::new(
        "user",
        HttpMethod::GET,
        "{{BASE_URL}}/{{VERSION}}/users/{{USER_ID}}?api_key={{API_KEY}}",
    ));

    let result = fixture
        .workbench
        .execute_request(
            &id,
            ExecuteRequestBody {
                environment_id: Some(env.id.clone()),
                ..ExecuteRequestBody::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        result.url,
        format!("{}/v2/users/12345?api_key=secret-key-123", server.uri())
    );
    assert_eq!(result.status_code(), Some(200));
    assert_eq!(result.response_body(), Some(r#"{"id":"12345"}"#));
    assert_eq!(result.environment_id.as_deref(), Some(env.id.as_str()));
}

#[tokio::test]
async fn test_header_and_body_overrides() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("X", "2"))
        .and(header("Y", "3"))
        .and(body_string("override"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    let mut def = RequestDefinition::new("create", HttpMethod::POST, "https://stored.invalid/items");
    def.add_header("X", "1");
    def.set_body(BodyType::Raw, "stored");
    let id = fixture.store(def);

    let body: ExecuteRequestBody = serde_json::from_value(json!({
        "overrideUrl": format!("{}/items", server.uri()),
        "url": "https://alias.invalid/items",
        "headers": {"X": "2", "Y": "3"},
        "overrideBody": "override"
    }))
    .unwrap();

    let result = fixture.workbench.execute_request(&id, body).await.unwrap();

    assert_eq!(result.status_code(), Some(201));
    assert_eq!(result.headers.get("X").map(String::as_str), Some("2"));
    assert_eq!(result.headers.get("Y").map(String::as_str), Some("3"));
    assert_eq!(result.request_body.as_deref(), Some("override"));
}

#[tokio::test]
async fn test_fallback_uses_most_recently_created_active_environment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/newest"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let environments = InMemoryEnvironmentStore::from_environments(vec![
        environment("older", "ws-a", 10, "https://older.invalid"),
        environment("newer", "ws-b", 1, &server.uri()),
    ]);
    let fixture = Fixture::with_environments(environments);
    let id = fixture.store(RequestDefinition::new("r", HttpMethod::GET, "{{BASE_URL}}/newest"));

    let result = fixture
        .workbench
        .engine()
        .execute(&id, ExecutionOverrides::new())
        .await
        .unwrap();

    assert_eq!(result.environment_id.as_deref(), Some("newer"));
    assert_eq!(result.status_code(), Some(200));
}

#[tokio::test]
async fn test_no_placeholders_skips_environment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let environments = InMemoryEnvironmentStore::from_environments(vec![environment(
        "active",
        "ws-a",
        1,
        "https://unused.invalid",
    )]);
    let fixture = Fixture::with_environments(environments);
    let id = fixture.store(RequestDefinition::new(
        "plain",
        HttpMethod::GET,
        format!("{}/plain", server.uri()),
    ));

    let result = fixture
        .workbench
        .engine()
        .execute(&id, ExecutionOverrides::new())
        .await
        .unwrap();

    assert!(result.environment_id.is_none());
    assert_eq!(result.status_code(), Some(204));
}

#[tokio::test]
async fn test_missing_explicit_environment_leaves_url_unresolved() {
    let fixture = Fixture::new();
    let id = fixture.store(RequestDefinition::new("r", HttpMethod::GET, "{{BASE_URL}}/x"));

    let result = fixture
        .workbench
        .engine()
        .execute(
            &id,
            ExecutionOverrides::new().with_environment("00000000-0000-4000-8000-000000000000"),
        )
        .await
        .unwrap();

    assert_eq!(result.url, "{{BASE_URL}}/x");
    assert!(result.environment_id.is_none());
    assert!(result.is_failure());
    assert!(result.response().is_none());
}

#[tokio::test]
async fn test_connection_failure_is_folded_into_result() {
    let fixture = Fixture::new();
    let id = fixture.store(RequestDefinition::new(
        "down",
        HttpMethod::GET,
        "http://127.0.0.1:1/unreachable",
    ));

    let result = fixture
        .workbench
        .execute_request(&id, ExecuteRequestBody::default())
        .await
        .unwrap();

    assert!(result.is_failure());
    assert!(result.error_message().is_some());
    assert!(matches!(
        result.outcome,
        rest_workbench::ExecutionOutcome::Failed {
            kind: FailureKind::Network,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let fixture = Fixture::new();
    let missing = uuid::Uuid::new_v4().to_string();

    let err = fixture
        .workbench
        .engine()
        .execute(&missing, ExecutionOverrides::new())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let api_err = fixture
        .workbench
        .execute_request(&missing, ExecuteRequestBody::default())
        .await
        .unwrap_err();
    assert_eq!(api_err.status_code(), 404);
}

#[tokio::test]
async fn test_stored_auth_and_query_params_are_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("Authorization", "Bearer tok-42"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    let env = fixture
        .environments
        .create(
            NewEnvironment::new("dev")
                .with_variable("BASE_URL", server.uri())
                .with_variable("TOKEN", "tok-42")
                .with_variable("PAGE", "2"),
        )
        .unwrap();

    let mut def = RequestDefinition::new("secure", HttpMethod::GET, "{{BASE_URL}}/secure");
    def.auth_type = AuthType::Bearer;
    def.auth_details = Some(json!({"token": "{{TOKEN}}"}));
    def.query_params = Some(HashMap::from([("page".to_string(), "{{PAGE}}".to_string())]));
    let id = fixture.store(def);

    let result = fixture
        .workbench
        .engine()
        .execute(&id, ExecutionOverrides::new().with_environment(&env.id))
        .await
        .unwrap();

    assert_eq!(result.status_code(), Some(200));
    assert_eq!(
        result.headers.get("Authorization").map(String::as_str),
        Some("Bearer tok-42")
    );
}

#[tokio::test]
async fn test_explicit_authorization_header_wins_over_stored_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer caller"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let fixture = Fixture::new();
    let mut def = RequestDefinition::new("r", HttpMethod::GET, server.uri());
    def.auth_type = AuthType::Bearer;
    def.auth_details = Some(json!({"token": "stored"}));
    let id = fixture.store(def);

    let result = fixture
        .workbench
        .engine()
        .execute(
            &id,
            ExecutionOverrides::new().with_header("authorization", "Bearer caller"),
        )
        .await
        .unwrap();

    assert_eq!(result.status_code(), Some(200));
    assert!(!result.headers.contains_key("Authorization"));
}
