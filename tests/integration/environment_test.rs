//! Environment activation and variable resolution through the service layer.

use super::Fixture;
use rest_workbench::api::{ActivateBody, ApiEnvelope, ResolveBody};
use rest_workbench::{EnvironmentStore, NewEnvironment};
use std::sync::Arc;

#[test]
fn test_resolve_end_to_end_scenario() {
    let fixture = Fixture::new();
    let env = fixture
        .environments
        .create(
            NewEnvironment::new("prod")
                .with_variable("BASE_URL", "https://api.example.com")
                .with_variable("VERSION", "v2")
                .with_variable("USER_ID", "12345")
                .with_variable("API_KEY", "secret-key-123"),
        )
        .unwrap();

    let result = fixture.workbench.resolve_variables(
        &env.id,
        ResolveBody {
            text: Some("{{BASE_URL}}/{{VERSION}}/users/{{USER_ID}}?api_key={{API_KEY}}".into()),
        },
    );
    let (status, envelope) = ApiEnvelope::respond(result, "Variables resolved successfully");

    assert_eq!(status, 200);
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(
        json["data"]["resolvedText"],
        "https://api.example.com/v2/users/12345?api_key=secret-key-123"
    );
    assert_eq!(json["message"], "Variables resolved successfully");
}

#[test]
fn test_resolve_against_missing_environment_is_not_found() {
    let fixture = Fixture::new();
    let missing = uuid::Uuid::new_v4().to_string();

    let (status, envelope) = ApiEnvelope::respond(
        fixture.workbench.resolve_variables(
            &missing,
            ResolveBody {
                text: Some("{{A}}".into()),
            },
        ),
        "Variables resolved successfully",
    );

    assert_eq!(status, 404);
    assert!(!envelope.success);
    assert!(envelope.message.contains("Environment not found"));
}

#[test]
fn test_activation_with_explicit_workspace() {
    let fixture = Fixture::new();
    let workspace = uuid::Uuid::new_v4().to_string();
    let ids: Vec<String> = (0..4)
        .map(|i| {
            fixture
                .environments
                .create(NewEnvironment::new(format!("env-{}", i)).in_workspace(&workspace))
                .unwrap()
                .id
        })
        .collect();

    for id in &ids {
        fixture
            .workbench
            .activate_environment(id, ActivateBody::default())
            .unwrap();
    }

    let target = &ids[1];
    let activated = fixture
        .workbench
        .activate_environment(
            target,
            ActivateBody {
                workspace_id: Some(workspace.clone()),
            },
        )
        .unwrap();
    assert!(activated.is_active);

    let active: Vec<_> = fixture
        .environments
        .list_by_workspace(&workspace)
        .unwrap()
        .into_iter()
        .filter(|env| env.is_active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(&active[0].id, target);
}

#[test]
fn test_concurrent_activation_leaves_one_active() {
    let fixture = Arc::new(Fixture::new());
    let workspace = uuid::Uuid::new_v4().to_string();
    let ids: Vec<String> = (0..8)
        .map(|i| {
            fixture
                .environments
                .create(NewEnvironment::new(format!("env-{}", i)).in_workspace(&workspace))
                .unwrap()
                .id
        })
        .collect();

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let fixture = Arc::clone(&fixture);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    fixture
                        .workbench
                        .activate_environment(&id, ActivateBody::default())
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let active_count = fixture
        .environments
        .list_by_workspace(&workspace)
        .unwrap()
        .iter()
        .filter(|env| env.is_active)
        .count();
    assert_eq!(active_count, 1);
}

#[test]
fn test_deactivate_leaves_workspace_without_active_environment() {
    let fixture = Fixture::new();
    let workspace = uuid::Uuid::new_v4().to_string();
    let env = fixture
        .environments
        .create(NewEnvironment::new("dev").in_workspace(&workspace).active())
        .unwrap();

    let (status, _) = ApiEnvelope::respond(
        fixture.workbench.deactivate_environment(&env.id),
        "Environment deactivated successfully",
    );

    assert_eq!(status, 200);
    assert!(fixture
        .environments
        .get_active_for_workspace(&workspace)
        .unwrap()
        .is_none());
}
