//! Environment storage.
//!
//! [`EnvironmentStore`] is the seam between the execution engine and
//! wherever environments are persisted. [`InMemoryEnvironmentStore`] keeps
//! them behind a single `RwLock`, so each mutation (and in particular
//! activation) is applied as one atomic unit.

use super::models::{Environment, EnvironmentUpdate, NewEnvironment};
use crate::error::{EntityKind, StoreError};
use crate::variables;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Read/update/activate operations over stored environments.
pub trait EnvironmentStore: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<Environment, StoreError>;

    /// All environments ordered by name.
    fn list_all(&self) -> Result<Vec<Environment>, StoreError>;

    /// Environments of a workspace, active first, then by name.
    fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Environment>, StoreError>;

    /// The active environment of a workspace, `None` when none is active.
    fn get_active_for_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Option<Environment>, StoreError>;

    /// The most recently created active environment across all workspaces.
    fn find_most_recent_active(&self) -> Result<Option<Environment>, StoreError>;

    /// Inserts an environment. It is created inactive; an activation request
    /// with a workspace is then carried out through [`Self::activate`].
    fn create(&self, new_environment: NewEnvironment) -> Result<Environment, StoreError>;

    fn update(&self, id: &str, update: EnvironmentUpdate) -> Result<Environment, StoreError>;

    fn delete(&self, id: &str) -> Result<Environment, StoreError>;

    /// Cascade delete for a removed workspace.
    fn delete_by_workspace(&self, workspace_id: &str) -> Result<Vec<Environment>, StoreError>;

    fn set_variable(&self, id: &str, key: &str, value: &str) -> Result<Environment, StoreError>;

    fn remove_variable(&self, id: &str, key: &str) -> Result<Environment, StoreError>;

    /// Deactivates every environment of the target workspace (the given one,
    /// else the environment's own) and activates `id`, atomically.
    fn activate(&self, id: &str, workspace_id: Option<&str>) -> Result<Environment, StoreError>;

    fn deactivate(&self, id: &str) -> Result<Environment, StoreError>;

    /// Resolves placeholders in `text` with the environment's variables.
    fn resolve_text(&self, id: &str, text: &str) -> Result<String, StoreError> {
        let environment = self.get_by_id(id)?;
        Ok(variables::resolve(text, &environment.variables))
    }
}

/// Thread-safe in-memory environment store.
#[derive(Debug, Default)]
pub struct InMemoryEnvironmentStore {
    environments: RwLock<HashMap<String, Environment>>,
}

impl InMemoryEnvironmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from previously persisted environments, keeping their
    /// stored activation flags as-is.
    pub fn from_environments(environments: impl IntoIterator<Item = Environment>) -> Self {
        let environments = environments
            .into_iter()
            .map(|env| (env.id.clone(), env))
            .collect();
        Self {
            environments: RwLock::new(environments),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Environment>>, StoreError> {
        self.environments.read().map_err(|_| StoreError::poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Environment>>, StoreError> {
        self.environments.write().map_err(|_| StoreError::poisoned())
    }

    /// Read-modify-write of one environment under the write lock.
    fn modify<F>(&self, id: &str, f: F) -> Result<Environment, StoreError>
    where
        F: FnOnce(&mut Environment),
    {
        let mut envs = self.write()?;
        let env = envs
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Environment, id))?;
        f(env);
        env.updated_at = Utc::now();
        Ok(env.clone())
    }
}

/// The only place `is_active` is ever set to `true`.
fn activate_locked(
    envs: &mut HashMap<String, Environment>,
    id: &str,
    workspace_id: Option<&str>,
) -> Result<Environment, StoreError> {
    let own_workspace = envs
        .get(id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Environment, id))?
        .workspace_id
        .clone();

    let target_workspace = workspace_id.map(str::to_string).or(own_workspace);
    let now = Utc::now();

    if let Some(target) = target_workspace.as_deref() {
        for env in envs.values_mut().filter(|env| env.in_workspace(target)) {
            if env.is_active {
                env.is_active = false;
                env.updated_at = now;
            }
        }
    }

    let env = envs
        .get_mut(id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Environment, id))?;
    env.is_active = true;
    env.updated_at = now;

    log::debug!(
        "Activated environment '{}' ({}) in workspace {:?}",
        env.name,
        env.id,
        target_workspace
    );

    Ok(env.clone())
}

fn deactivate_locked(
    envs: &mut HashMap<String, Environment>,
    id: &str,
) -> Result<Environment, StoreError> {
    let env = envs
        .get_mut(id)
        .ok_or_else(|| StoreError::not_found(EntityKind::Environment, id))?;
    env.is_active = false;
    env.updated_at = Utc::now();
    Ok(env.clone())
}

impl EnvironmentStore for InMemoryEnvironmentStore {
    fn get_by_id(&self, id: &str) -> Result<Environment, StoreError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(EntityKind::Environment, id))
    }

    fn list_all(&self) -> Result<Vec<Environment>, StoreError> {
        let mut all: Vec<Environment> = self.read()?.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    fn list_by_workspace(&self, workspace_id: &str) -> Result<Vec<Environment>, StoreError> {
        let mut list: Vec<Environment> = self
            .read()?
            .values()
            .filter(|env| env.in_workspace(workspace_id))
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            b.is_active
                .cmp(&a.is_active)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(list)
    }

    fn get_active_for_workspace(
        &self,
        workspace_id: &str,
    ) -> Result<Option<Environment>, StoreError> {
        Ok(self
            .read()?
            .values()
            .find(|env| env.is_active && env.in_workspace(workspace_id))
            .cloned())
    }

    fn find_most_recent_active(&self) -> Result<Option<Environment>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|env| env.is_active)
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .cloned())
    }

    fn create(&self, new_environment: NewEnvironment) -> Result<Environment, StoreError> {
        let now = Utc::now();
        let env = Environment {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: new_environment.workspace_id,
            name: new_environment.name,
            variables: new_environment.variables,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        let id = env.id.clone();

        let mut envs = self.write()?;
        envs.insert(id.clone(), env.clone());

        if new_environment.is_active && env.workspace_id.is_some() {
            return activate_locked(&mut envs, &id, None);
        }

        Ok(env)
    }

    fn update(&self, id: &str, update: EnvironmentUpdate) -> Result<Environment, StoreError> {
        let mut envs = self.write()?;
        let env = envs
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Environment, id))?;

        let moved = update
            .workspace_id
            .as_deref()
            .map_or(false, |ws| env.workspace_id.as_deref() != Some(ws));
        let was_active = env.is_active;

        if let Some(name) = update.name {
            env.name = name;
        }
        if let Some(workspace_id) = update.workspace_id.clone() {
            env.workspace_id = Some(workspace_id);
        }
        if let Some(variables) = update.variables {
            env.variables = variables;
        }
        env.updated_at = Utc::now();
        let updated = env.clone();

        match update.is_active {
            Some(true) => activate_locked(&mut envs, id, update.workspace_id.as_deref()),
            Some(false) => deactivate_locked(&mut envs, id),
            // An active environment moved into another workspace takes over there
            None if moved && was_active => {
                activate_locked(&mut envs, id, update.workspace_id.as_deref())
            }
            None => Ok(updated),
        }
    }

    fn delete(&self, id: &str) -> Result<Environment, StoreError> {
        self.write()?
            .remove(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Environment, id))
    }

    fn delete_by_workspace(&self, workspace_id: &str) -> Result<Vec<Environment>, StoreError> {
        let mut envs = self.write()?;
        let ids: Vec<String> = envs
            .values()
            .filter(|env| env.in_workspace(workspace_id))
            .map(|env| env.id.clone())
            .collect();
        Ok(ids.iter().filter_map(|id| envs.remove(id)).collect())
    }

    fn set_variable(&self, id: &str, key: &str, value: &str) -> Result<Environment, StoreError> {
        self.modify(id, |env| {
            env.variables.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_variable(&self, id: &str, key: &str) -> Result<Environment, StoreError> {
        self.modify(id, |env| {
            env.variables.remove(key);
        })
    }

    fn activate(&self, id: &str, workspace_id: Option<&str>) -> Result<Environment, StoreError> {
        let mut envs = self.write()?;
        activate_locked(&mut envs, id, workspace_id)
    }

    fn deactivate(&self, id: &str) -> Result<Environment, StoreError> {
        let mut envs = self.write()?;
        deactivate_locked(&mut envs, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use std::thread;

    fn env(id: &str, name: &str, workspace: Option<&str>, active: bool) -> Environment {
        let now = Utc::now();
        Environment {
            id: id.to_string(),
            workspace_id: workspace.map(str::to_string),
            name: name.to_string(),
            variables: HashMap::new(),
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_ids(store: &InMemoryEnvironmentStore, workspace: &str) -> Vec<String> {
        store
            .list_by_workspace(workspace)
            .unwrap()
            .into_iter()
            .filter(|e| e.is_active)
            .map(|e| e.id)
            .collect()
    }

    #[test]
    fn test_create_is_inactive_by_default() {
        let store = InMemoryEnvironmentStore::new();
        let created = store
            .create(NewEnvironment::new("dev").in_workspace("ws-1"))
            .unwrap();

        assert!(!created.is_active);
        assert_eq!(store.get_by_id(&created.id).unwrap(), created);
    }

    #[test]
    fn test_create_active_goes_through_activation() {
        let store = InMemoryEnvironmentStore::new();
        let first = store
            .create(NewEnvironment::new("dev").in_workspace("ws-1").active())
            .unwrap();
        let second = store
            .create(NewEnvironment::new("prod").in_workspace("ws-1").active())
            .unwrap();

        assert!(second.is_active);
        assert!(!store.get_by_id(&first.id).unwrap().is_active);
        assert_eq!(active_ids(&store, "ws-1"), vec![second.id]);
    }

    #[test]
    fn test_create_active_without_workspace_stays_inactive() {
        let store = InMemoryEnvironmentStore::new();
        let created = store.create(NewEnvironment::new("loose").active()).unwrap();
        assert!(!created.is_active);
    }

    #[test]
    fn test_get_by_id_not_found() {
        let store = InMemoryEnvironmentStore::new();
        let err = store.get_by_id("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_activation_exclusivity_from_inconsistent_state() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), true),
            env("b", "beta", Some("ws-1"), true),
            env("c", "gamma", Some("ws-1"), false),
            env("x", "other", Some("ws-2"), true),
        ]);

        let activated = store.activate("c", None).unwrap();
        assert!(activated.is_active);
        assert_eq!(active_ids(&store, "ws-1"), vec!["c".to_string()]);

        // Other workspaces are untouched
        assert!(store.get_by_id("x").unwrap().is_active);
    }

    #[test]
    fn test_activation_from_zero_active() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), false),
            env("b", "beta", Some("ws-1"), false),
        ]);

        store.activate("b", None).unwrap();
        assert_eq!(active_ids(&store, "ws-1"), vec!["b".to_string()]);
    }

    #[test]
    fn test_activation_with_explicit_workspace() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), true),
            env("b", "beta", None, false),
        ]);

        store.activate("b", Some("ws-1")).unwrap();
        assert!(!store.get_by_id("a").unwrap().is_active);
        assert!(store.get_by_id("b").unwrap().is_active);
    }

    #[test]
    fn test_activation_without_workspace_touches_nothing_else() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", None, true),
            env("b", "beta", None, false),
        ]);

        store.activate("b", None).unwrap();
        assert!(store.get_by_id("a").unwrap().is_active);
        assert!(store.get_by_id("b").unwrap().is_active);
    }

    #[test]
    fn test_activate_not_found() {
        let store = InMemoryEnvironmentStore::new();
        assert!(store.activate("nope", None).unwrap_err().is_not_found());
        assert!(store.deactivate("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_deactivate_is_unconditional() {
        let store = InMemoryEnvironmentStore::from_environments(vec![env(
            "a",
            "alpha",
            Some("ws-1"),
            false,
        )]);

        let env = store.deactivate("a").unwrap();
        assert!(!env.is_active);
        assert!(store.get_active_for_workspace("ws-1").unwrap().is_none());
    }

    #[test]
    fn test_list_by_workspace_active_first_then_name() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("1", "charlie", Some("ws-1"), false),
            env("2", "alpha", Some("ws-1"), false),
            env("3", "zulu", Some("ws-1"), true),
            env("4", "bravo", Some("ws-2"), false),
        ]);

        let names: Vec<String> = store
            .list_by_workspace("ws-1")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["zulu", "alpha", "charlie"]);
    }

    #[test]
    fn test_get_active_for_workspace() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), false),
            env("b", "beta", Some("ws-1"), true),
        ]);

        let active = store.get_active_for_workspace("ws-1").unwrap().unwrap();
        assert_eq!(active.id, "b");
        assert!(store.get_active_for_workspace("ws-9").unwrap().is_none());
    }

    #[test]
    fn test_find_most_recent_active_across_workspaces() {
        let mut older = env("old", "older", Some("ws-1"), true);
        older.created_at = Utc::now() - Duration::hours(2);
        let mut newer = env("new", "newer", Some("ws-2"), true);
        newer.created_at = Utc::now() - Duration::minutes(5);
        let mut newest_inactive = env("idle", "idle", Some("ws-3"), false);
        newest_inactive.created_at = Utc::now();

        let store = InMemoryEnvironmentStore::from_environments(vec![older, newer, newest_inactive]);
        let found = store.find_most_recent_active().unwrap().unwrap();
        assert_eq!(found.id, "new");
    }

    #[test]
    fn test_find_most_recent_active_none() {
        let store = InMemoryEnvironmentStore::from_environments(vec![env(
            "a",
            "alpha",
            Some("ws-1"),
            false,
        )]);
        assert!(store.find_most_recent_active().unwrap().is_none());
    }

    #[test]
    fn test_set_and_remove_variable() {
        let store = InMemoryEnvironmentStore::new();
        let created = store
            .create(NewEnvironment::new("dev").with_variable("A", "1"))
            .unwrap();

        let updated = store.set_variable(&created.id, "B", "2").unwrap();
        assert_eq!(updated.get("A").unwrap(), "1");
        assert_eq!(updated.get("B").unwrap(), "2");

        let updated = store.set_variable(&created.id, "A", "10").unwrap();
        assert_eq!(updated.get("A").unwrap(), "10");

        let updated = store.remove_variable(&created.id, "A").unwrap();
        assert!(!updated.contains("A"));
        assert!(updated.contains("B"));

        // Removing an absent key is not an error
        store.remove_variable(&created.id, "A").unwrap();

        assert!(store.set_variable("missing", "k", "v").unwrap_err().is_not_found());
        assert!(store.remove_variable("missing", "k").unwrap_err().is_not_found());
    }

    #[test]
    fn test_concurrent_set_variable_loses_no_updates() {
        let store = Arc::new(InMemoryEnvironmentStore::new());
        let id = store.create(NewEnvironment::new("dev")).unwrap().id;

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = id.clone();
                thread::spawn(move || {
                    store
                        .set_variable(&id, &format!("key{}", i), &i.to_string())
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get_by_id(&id).unwrap().variables.len(), 16);
    }

    #[test]
    fn test_concurrent_activation_leaves_exactly_one_active() {
        let envs: Vec<Environment> = (0..8)
            .map(|i| env(&format!("e{}", i), &format!("env{}", i), Some("ws-1"), false))
            .collect();
        let store = Arc::new(InMemoryEnvironmentStore::from_environments(envs));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        store.activate(&format!("e{}", i), None).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(active_ids(&store, "ws-1").len(), 1);
    }

    #[test]
    fn test_moving_active_environment_keeps_one_active_per_workspace() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), true),
            env("b", "beta", Some("ws-2"), true),
        ]);

        let moved = store
            .update(
                "b",
                EnvironmentUpdate {
                    workspace_id: Some("ws-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(moved.is_active);
        assert_eq!(moved.workspace_id.as_deref(), Some("ws-1"));
        assert_eq!(active_ids(&store, "ws-1"), vec!["b".to_string()]);
        assert!(active_ids(&store, "ws-2").is_empty());
    }

    #[test]
    fn test_moving_inactive_environment_leaves_target_active_untouched() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), true),
            env("b", "beta", Some("ws-2"), false),
        ]);

        store
            .update(
                "b",
                EnvironmentUpdate {
                    workspace_id: Some("ws-1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(active_ids(&store, "ws-1"), vec!["a".to_string()]);
    }

    #[test]
    fn test_update_fields_and_activation() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), true),
            env("b", "beta", Some("ws-1"), false),
        ]);

        let updated = store
            .update(
                "b",
                EnvironmentUpdate {
                    name: Some("beta-2".to_string()),
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "beta-2");
        assert!(updated.is_active);
        assert!(!store.get_by_id("a").unwrap().is_active);

        let updated = store
            .update(
                "b",
                EnvironmentUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!updated.is_active);

        assert!(store
            .update("missing", EnvironmentUpdate::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_delete_and_cascade() {
        let store = InMemoryEnvironmentStore::from_environments(vec![
            env("a", "alpha", Some("ws-1"), false),
            env("b", "beta", Some("ws-1"), false),
            env("c", "gamma", Some("ws-2"), false),
        ]);

        store.delete("a").unwrap();
        assert!(store.delete("a").unwrap_err().is_not_found());

        let removed = store.delete_by_workspace("ws-1").unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_text() {
        let store = InMemoryEnvironmentStore::new();
        let created = store
            .create(
                NewEnvironment::new("dev")
                    .with_variable("BASE_URL", "https://api.example.com")
                    .with_variable("VERSION", "v1"),
            )
            .unwrap();

        let resolved = store
            .resolve_text(&created.id, "{{BASE_URL}}/{{VERSION}}/users/{{MISSING_VAR}}")
            .unwrap();
        assert_eq!(resolved, "https://api.example.com/v1/users/{{MISSING_VAR}}");

        let empty = store.create(NewEnvironment::new("empty")).unwrap();
        assert_eq!(
            store.resolve_text(&empty.id, "{{BASE_URL}}").unwrap(),
            "{{BASE_URL}}"
        );

        assert!(store.resolve_text("missing", "x").unwrap_err().is_not_found());
    }
}
