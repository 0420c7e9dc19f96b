//! Postgres document store tests

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::PgPool;

    use forex_request_backend::db::run_migrations;
    use forex_request_backend::store::{DocumentStore, ObjectId, PgDocumentStore, StoreError};

    /// Helper to create a migrated test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/forex_requests_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        run_migrations(&pool).await.expect("Failed to migrate test database");
        pool
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_insert_and_find() {
        let store = PgDocumentStore::new(setup_test_db().await);
        let id = ObjectId::new();

        store
            .insert("currencies", id, json!({ "id": id, "code": "USD", "is_deleted": false }))
            .await
            .unwrap();

        let found = store.find_by_id("currencies", id).await.unwrap().unwrap();
        assert_eq!(found["code"], "USD");

        let err = store
            .insert("currencies", id, json!({ "id": id }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_soft_deleted_documents_are_hidden() {
        let store = PgDocumentStore::new(setup_test_db().await);
        let live = ObjectId::new();
        let deleted = ObjectId::new();
        let tag = ObjectId::new().to_hex();

        for (id, is_deleted) in [(live, false), (deleted, true)] {
            store
                .insert(
                    "countries",
                    id,
                    json!({ "id": id, "code": tag, "is_deleted": is_deleted }),
                )
                .await
                .unwrap();
        }

        assert!(store.find_by_id("countries", deleted).await.unwrap().is_none());

        let many = store
            .find_many("countries", &[live, deleted])
            .await
            .unwrap();
        assert_eq!(many.len(), 1);

        let tagged = store
            .find_all_by("countries", "code", &json!(tag))
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0]["id"], json!(live));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_replace_missing_document() {
        let store = PgDocumentStore::new(setup_test_db().await);

        let replaced = store
            .replace("requests", ObjectId::new(), json!({ "status": "new" }))
            .await
            .unwrap();
        assert!(!replaced);

        let err = store.find_all("loans").await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownCollection(_)));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_remove_deletes_the_row() {
        let store = PgDocumentStore::new(setup_test_db().await);
        let id = ObjectId::new();

        store
            .insert("token_blacklist", id, json!({ "id": id, "is_deleted": false }))
            .await
            .unwrap();

        assert!(store.remove("token_blacklist", id).await.unwrap());
        assert!(!store.remove("token_blacklist", id).await.unwrap());
        assert!(store.find_by_id("token_blacklist", id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_ping() {
        let store = PgDocumentStore::new(setup_test_db().await);
        assert!(store.ping().await.is_ok());
    }
}
