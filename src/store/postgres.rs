//! Postgres document store
//!
//! One table per collection, each holding `id TEXT`, the JSONB `document` and
//! a generated `is_deleted` column (see `migrations/`).

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use super::{DocumentStore, ObjectId, StoreError, COLLECTION_NAMES};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Table names cannot be bound, so only known collections are accepted.
fn table(collection: &str) -> Result<&'static str, StoreError> {
    COLLECTION_NAMES
        .iter()
        .copied()
        .find(|name| *name == collection)
        .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(
        &self,
        collection: &str,
        id: ObjectId,
        document: Value,
    ) -> Result<(), StoreError> {
        let table = table(collection)?;

        sqlx::query(&format!(
            "INSERT INTO {} (id, document) VALUES ($1, $2)",
            table
        ))
        .bind(id.to_hex())
        .bind(Json(document))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate {
                collection: collection.to_string(),
                detail: db.message().to_string(),
            },
            other => StoreError::from(other),
        })?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: ObjectId,
    ) -> Result<Option<Value>, StoreError> {
        let table = table(collection)?;

        let document = sqlx::query_scalar::<_, Json<Value>>(&format!(
            "SELECT document FROM {} WHERE id = $1 AND NOT is_deleted",
            table
        ))
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await?;

        Ok(document.map(|Json(value)| value))
    }

    async fn find_many(
        &self,
        collection: &str,
        ids: &[ObjectId],
    ) -> Result<Vec<Value>, StoreError> {
        let table = table(collection)?;
        let ids: Vec<String> = ids.iter().map(ObjectId::to_hex).collect();

        let documents = sqlx::query_scalar::<_, Json<Value>>(&format!(
            "SELECT document FROM {} WHERE id = ANY($1) AND NOT is_deleted",
            table
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(documents.into_iter().map(|Json(value)| value).collect())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let table = table(collection)?;

        let documents = sqlx::query_scalar::<_, Json<Value>>(&format!(
            "SELECT document FROM {} WHERE NOT is_deleted ORDER BY inserted_at",
            table
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(documents.into_iter().map(|Json(value)| value).collect())
    }

    async fn find_all_by(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let table = table(collection)?;

        let documents = sqlx::query_scalar::<_, Json<Value>>(&format!(
            "SELECT document FROM {} WHERE document -> $1 = $2 AND NOT is_deleted ORDER BY inserted_at",
            table
        ))
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await?;

        Ok(documents.into_iter().map(|Json(value)| value).collect())
    }

    async fn replace(
        &self,
        collection: &str,
        id: ObjectId,
        document: Value,
    ) -> Result<bool, StoreError> {
        let table = table(collection)?;

        let rows_affected = sqlx::query(&format!(
            "UPDATE {} SET document = $2, updated_at = NOW() WHERE id = $1",
            table
        ))
        .bind(id.to_hex())
        .bind(Json(document))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn remove(&self, collection: &str, id: ObjectId) -> Result<bool, StoreError> {
        let table = table(collection)?;

        let rows_affected = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id.to_hex())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
