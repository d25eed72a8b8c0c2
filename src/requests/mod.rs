//! Stored request definitions.
//!
//! The execution engine only reads definitions through [`RequestStore`]; the
//! CRUD operations exist for callers that own the collection tree.

use crate::error::{EntityKind, StoreError};
use crate::models::{HttpMethod, RequestDefinition};
use chrono::Utc;
use dashmap::DashMap;

/// Access to stored request definitions.
pub trait RequestStore: Send + Sync {
    fn get_by_id(&self, id: &str) -> Result<RequestDefinition, StoreError>;

    /// All definitions, by sort order then name.
    fn list_all(&self) -> Result<Vec<RequestDefinition>, StoreError>;

    /// Definitions of one collection, by sort order then name.
    fn list_by_collection(&self, collection_id: &str)
        -> Result<Vec<RequestDefinition>, StoreError>;

    /// Definitions with the same method and raw URL, most recently updated first.
    fn find_similar(
        &self,
        method: HttpMethod,
        url: &str,
    ) -> Result<Vec<RequestDefinition>, StoreError>;

    /// Stores a definition, replacing any existing one with the same id.
    fn insert(&self, definition: RequestDefinition) -> Result<RequestDefinition, StoreError>;

    /// Replaces an existing definition. NotFound when the id is unknown.
    fn update(&self, definition: RequestDefinition) -> Result<RequestDefinition, StoreError>;

    fn update_sort_order(&self, id: &str, sort_order: i32)
        -> Result<RequestDefinition, StoreError>;

    fn delete(&self, id: &str) -> Result<RequestDefinition, StoreError>;

    /// Cascade delete for a removed collection.
    fn delete_by_collection(&self, collection_id: &str)
        -> Result<Vec<RequestDefinition>, StoreError>;
}

/// Concurrent in-memory request store.
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    requests: DashMap<String, RequestDefinition>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: impl IntoIterator<Item = RequestDefinition>) -> Self {
        let requests = DashMap::new();
        for definition in definitions {
            requests.insert(definition.id.clone(), definition);
        }
        Self { requests }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn collect_sorted<F>(&self, filter: F) -> Vec<RequestDefinition>
    where
        F: Fn(&RequestDefinition) -> bool,
    {
        let mut list: Vec<RequestDefinition> = self
            .requests
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        list.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }
}

impl RequestStore for InMemoryRequestStore {
    fn get_by_id(&self, id: &str) -> Result<RequestDefinition, StoreError> {
        self.requests
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(EntityKind::Request, id))
    }

    fn list_all(&self) -> Result<Vec<RequestDefinition>, StoreError> {
        Ok(self.collect_sorted(|_| true))
    }

    fn list_by_collection(
        &self,
        collection_id: &str,
    ) -> Result<Vec<RequestDefinition>, StoreError> {
        Ok(self.collect_sorted(|def| def.collection_id.as_deref() == Some(collection_id)))
    }

    fn find_similar(
        &self,
        method: HttpMethod,
        url: &str,
    ) -> Result<Vec<RequestDefinition>, StoreError> {
        let mut list: Vec<RequestDefinition> = self
            .requests
            .iter()
            .filter(|entry| entry.method == method && entry.url == url)
            .map(|entry| entry.value().clone())
            .collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    fn insert(&self, definition: RequestDefinition) -> Result<RequestDefinition, StoreError> {
        self.requests
            .insert(definition.id.clone(), definition.clone());
        Ok(definition)
    }

    fn update(&self, mut definition: RequestDefinition) -> Result<RequestDefinition, StoreError> {
        let mut entry = self
            .requests
            .get_mut(&definition.id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Request, &definition.id))?;
        definition.created_at = entry.created_at;
        definition.updated_at = Utc::now();
        *entry = definition.clone();
        Ok(definition)
    }

    fn update_sort_order(
        &self,
        id: &str,
        sort_order: i32,
    ) -> Result<RequestDefinition, StoreError> {
        let mut entry = self
            .requests
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(EntityKind::Request, id))?;
        entry.sort_order = sort_order;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    fn delete(&self, id: &str) -> Result<RequestDefinition, StoreError> {
        self.requests
            .remove(id)
            .map(|(_, definition)| definition)
            .ok_or_else(|| StoreError::not_found(EntityKind::Request, id))
    }

    fn delete_by_collection(
        &self,
        collection_id: &str,
    ) -> Result<Vec<RequestDefinition>, StoreError> {
        let ids: Vec<String> = self
            .requests
            .iter()
            .filter(|entry| entry.collection_id.as_deref() == Some(collection_id))
            .map(|entry| entry.key().clone())
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| self.requests.remove(id).map(|(_, def)| def))
            .collect())
    }
}
