//! Document storage
//!
//! Every entity is persisted as a JSON document in its own collection. The
//! lifecycle engine and the reference/identity services only ever talk to the
//! typed [`Repository`] wrapper, so they run unchanged against Postgres or the
//! in-memory store.

mod collections;
mod memory;
mod object_id;
mod postgres;

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::Audit;

pub use collections::{Collections, COLLECTION_NAMES};
pub use memory::MemoryDocumentStore;
pub use object_id::{ObjectId, ObjectIdError};
pub use postgres::PgDocumentStore;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Document serialization failed: {0}")]
    Serialization(String),

    #[error("Duplicate document in {collection}: {detail}")]
    Duplicate { collection: String, detail: String },

    #[error("Document {id} not found in {collection}")]
    NotFound { collection: String, id: ObjectId },

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// A persisted entity
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> ObjectId;
    fn audit(&self) -> &Audit;
    fn audit_mut(&mut self) -> &mut Audit;
}

/// Untyped document storage backend.
///
/// Reads never return documents whose `is_deleted` field is true.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, collection: &str, id: ObjectId, document: Value)
        -> Result<(), StoreError>;

    async fn find_by_id(&self, collection: &str, id: ObjectId)
        -> Result<Option<Value>, StoreError>;

    /// Batch lookup (`id IN [...]`). Result order is not guaranteed.
    async fn find_many(&self, collection: &str, ids: &[ObjectId])
        -> Result<Vec<Value>, StoreError>;

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError>;

    /// Documents whose top-level `field` equals `value`
    async fn find_all_by(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError>;

    /// Overwrite a document. Returns false when no document has that id.
    async fn replace(&self, collection: &str, id: ObjectId, document: Value)
        -> Result<bool, StoreError>;

    /// Hard delete, for records that expire rather than retire. Returns false
    /// when no document has that id.
    async fn remove(&self, collection: &str, id: ObjectId) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Typed view over one collection
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub async fn create(&self, document: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(document)?;
        self.store.insert(T::COLLECTION, document.id(), value).await
    }

    pub async fn find_by_id(&self, id: ObjectId) -> Result<Option<T>, StoreError> {
        self.store
            .find_by_id(T::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Returns true when `id` resolves to a live document
    pub async fn exists(&self, id: ObjectId) -> Result<bool, StoreError> {
        Ok(self.store.find_by_id(T::COLLECTION, id).await?.is_some())
    }

    pub async fn find_many(&self, ids: &[ObjectId]) -> Result<Vec<T>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store
            .find_many(T::COLLECTION, ids)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_all(&self) -> Result<Vec<T>, StoreError> {
        self.store
            .find_all(T::COLLECTION)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_all_by<V: Serialize>(
        &self,
        field: &str,
        value: V,
    ) -> Result<Vec<T>, StoreError> {
        let value = serde_json::to_value(value)?;
        self.store
            .find_all_by(T::COLLECTION, field, &value)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn find_one_by<V: Serialize>(
        &self,
        field: &str,
        value: V,
    ) -> Result<Option<T>, StoreError> {
        Ok(self.find_all_by(field, value).await?.into_iter().next())
    }

    pub async fn update(&self, document: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(document)?;
        if self.store.replace(T::COLLECTION, document.id(), value).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                collection: T::COLLECTION.to_string(),
                id: document.id(),
            })
        }
    }

    /// Soft delete: flags the document, never removes it.
    ///
    /// Returns false when the document is absent or already deleted.
    pub async fn delete(
        &self,
        id: ObjectId,
        deleted_by: Option<ObjectId>,
    ) -> Result<bool, StoreError> {
        let Some(mut document) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        let audit = document.audit_mut();
        audit.is_deleted = true;
        audit.deleted_by = deleted_by;
        audit.deleted_at = Some(Utc::now());

        self.update(&document).await?;
        Ok(true)
    }

    /// Permanently remove a document
    pub async fn purge(&self, id: ObjectId) -> Result<bool, StoreError> {
        self.store.remove(T::COLLECTION, id).await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(StoreError::from)
}

/// True when a raw document carries `is_deleted: true`
pub(crate) fn is_soft_deleted(document: &Value) -> bool {
    document
        .get("is_deleted")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
