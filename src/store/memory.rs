//! In-memory document store used by tests and local development

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{is_soft_deleted, DocumentStore, ObjectId, StoreError};

/// Collections keep insertion order so listings are stable.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<(ObjectId, Value)>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw document lookup that ignores the soft-delete flag
    pub async fn raw(&self, collection: &str, id: ObjectId) -> Option<Value> {
        let collections = self.collections.read().await;
        collections
            .get(collection)?
            .iter()
            .find(|(doc_id, _)| *doc_id == id)
            .map(|(_, doc)| doc.clone())
    }

    async fn live<F>(&self, collection: &str, mut keep: F) -> Vec<Value>
    where
        F: FnMut(&ObjectId, &Value) -> bool,
    {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(id, doc)| !is_soft_deleted(doc) && keep(id, doc))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: ObjectId,
        document: Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.iter().any(|(doc_id, _)| *doc_id == id) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                detail: format!("id {}", id),
            });
        }

        docs.push((id, document));
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> Result<Option<Value>, StoreError> {
        Ok(self
            .live(collection, |doc_id, _| *doc_id == id)
            .await
            .into_iter()
            .next())
    }

    async fn find_many(
        &self,
        collection: &str,
        ids: &[ObjectId],
    ) -> Result<Vec<Value>, StoreError> {
        Ok(self.live(collection, |doc_id, _| ids.contains(doc_id)).await)
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self.live(collection, |_, _| true).await)
    }

    async fn find_all_by(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .live(collection, |_, doc| doc.get(field) == Some(value))
            .await)
    }

    async fn replace(
        &self,
        collection: &str,
        id: ObjectId,
        document: Value,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(slot) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| *doc_id == id))
        else {
            return Ok(false);
        };

        slot.1 = document;
        Ok(true)
    }

    async fn remove(&self, collection: &str, id: ObjectId) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let before = docs.len();
        docs.retain(|(doc_id, _)| *doc_id != id);
        Ok(docs.len() < before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
