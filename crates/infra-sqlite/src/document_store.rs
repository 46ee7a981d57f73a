// SQLite DocumentStore Implementation
//
// Each document is one row holding its JSON body. All writes for this
// process go through one async lock and one SQL transaction, so a
// read-modify-write never interleaves with another write and subscribers
// see versions in commit order.

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use queueline_core::domain::DocumentKey;
use queueline_core::error::{AppError, Result};
use queueline_core::port::document_store::{fill_missing_fields, merge_fields};
use queueline_core::port::{Document, DocumentStore, SnapshotHub, Subscription, TimeProvider, TransactFn};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
    hub: SnapshotHub,
    write_lock: Mutex<()>,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
            hub: SnapshotHub::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Number of committed writes to the document (0 if missing)
    pub async fn version(&self, key: &DocumentKey) -> Result<i64> {
        let version: Option<i64> = sqlx::query_scalar("SELECT version FROM documents WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(version.unwrap_or(0))
    }

    pub fn subscriber_count(&self, key: &DocumentKey) -> usize {
        self.hub.subscriber_count(key)
    }

    async fn read(
        tx: &mut Transaction<'_, Sqlite>,
        key: &DocumentKey,
    ) -> Result<Option<Document>> {
        let body: Option<String> = sqlx::query_scalar("SELECT body FROM documents WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn write(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        key: &DocumentKey,
        doc: &Document,
    ) -> Result<()> {
        if !doc.is_object() {
            return Err(AppError::Validation(format!(
                "Document {} must be an object",
                key
            )));
        }
        sqlx::query(
            r#"
            INSERT INTO documents (key, body, version, updated_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                version = documents.version + 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(doc.to_string())
        .bind(self.time_provider.now_millis())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool.begin().await.map_err(map_sqlx_error)
    }

    async fn commit(&self, tx: Transaction<'static, Sqlite>, key: &DocumentKey, doc: Document) -> Result<()> {
        tx.commit().await.map_err(|e| {
            warn!(key = %key, error = %e, "Document commit failed");
            map_sqlx_error(e)
        })?;
        debug!(key = %key, "Document committed");
        self.hub.publish(key, Some(doc));
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_if_missing(&self, key: &DocumentKey, default: Document) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.begin().await?;

        let next = match Self::read(&mut tx, key).await? {
            None => default,
            Some(mut existing) => {
                if !fill_missing_fields(&mut existing, &default) {
                    return Ok(());
                }
                existing
            }
        };
        self.write(&mut tx, key, &next).await?;
        self.commit(tx, key, next).await
    }

    async fn get_once(&self, key: &DocumentKey) -> Result<Option<Document>> {
        let mut tx = self.begin().await?;
        let doc = Self::read(&mut tx, key).await?;
        tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(doc)
    }

    async fn subscribe(&self, key: &DocumentKey) -> Result<Subscription> {
        // Read under the write lock so no commit lands between read and subscribe
        let _guard = self.write_lock.lock().await;
        let current = self.get_once(key).await?;
        Ok(self.hub.subscribe(key, current))
    }

    async fn overwrite_fields(&self, key: &DocumentKey, partial: Document) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.begin().await?;

        let mut doc = Self::read(&mut tx, key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Document {} not found", key)))?;
        if !merge_fields(&mut doc, &partial) {
            return Err(AppError::Validation(format!(
                "Document {} update must be an object",
                key
            )));
        }
        self.write(&mut tx, key, &doc).await?;
        self.commit(tx, key, doc).await
    }

    async fn transact(&self, key: &DocumentKey, f: &mut TransactFn<'_>) -> Result<Option<Document>> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.begin().await?;

        let current = Self::read(&mut tx, key).await?;
        match f(current.clone())? {
            Some(next) => {
                self.write(&mut tx, key, &next).await?;
                self.commit(tx, key, next.clone()).await?;
                Ok(Some(next))
            }
            None => Ok(current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use queueline_core::port::time_provider::mocks::ManualClock;
    use serde_json::json;

    async fn store() -> SqliteDocumentStore {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteDocumentStore::new(pool, Arc::new(ManualClock::new(1_000)))
    }

    #[tokio::test]
    async fn test_create_if_missing_fills_only_absent_fields() {
        let store = store().await;
        let key = DocumentKey::feed("store-1", "North");

        store.create_if_missing(&key, json!({"queue": []})).await.unwrap();
        store
            .overwrite_fields(&key, json!({"queue": [{"id": "a"}]}))
            .await
            .unwrap();
        store
            .create_if_missing(&key, json!({"queue": [], "active": [], "completed": []}))
            .await
            .unwrap();

        let doc = store.get_once(&key).await.unwrap().unwrap();
        assert_eq!(doc["queue"], json!([{"id": "a"}]));
        assert_eq!(doc["active"], json!([]));
        assert_eq!(store.version(&key).await.unwrap(), 3);

        // Nothing left to fill: no write
        store.create_if_missing(&key, json!({"queue": []})).await.unwrap();
        assert_eq!(store.version(&key).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_missing_document() {
        let store = store().await;
        let key = DocumentKey::new("stores/x/regions/y");

        assert_eq!(store.get_once(&key).await.unwrap(), None);
        assert_eq!(store.version(&key).await.unwrap(), 0);
        assert!(matches!(
            store.overwrite_fields(&key, json!({"queue": []})).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_transact_error_rolls_back() {
        let store = store().await;
        let key = DocumentKey::managers("store-1");
        store.create_if_missing(&key, json!({"managers": []})).await.unwrap();

        let result = store
            .transact(&key, &mut |_| Err(AppError::Conflict("boom".to_string())))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(
            store.get_once(&key).await.unwrap(),
            Some(json!({"managers": []}))
        );
    }

    #[tokio::test]
    async fn test_transact_creates_missing_document() {
        let store = store().await;
        let key = DocumentKey::saved_names("store-1");

        let committed = store
            .transact(&key, &mut |current| {
                assert!(current.is_none());
                Ok(Some(json!({"names": [{"id": "n1", "firstName": "Ana", "lastName": ""}]})))
            })
            .await
            .unwrap();

        assert_eq!(committed, store.get_once(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_transacts_serialize() {
        let store = Arc::new(store().await);
        let key = DocumentKey::new("counter");
        store.create_if_missing(&key, json!({"n": 0})).await.unwrap();

        let bumps = (0..10).map(|_| {
            let store = store.clone();
            let key = key.clone();
            async move {
                store
                    .transact(&key, &mut |current| {
                        let n = current.and_then(|d| d["n"].as_i64()).unwrap_or(0);
                        Ok(Some(json!({"n": n + 1})))
                    })
                    .await
                    .unwrap();
            }
        });
        futures::future::join_all(bumps).await;

        assert_eq!(store.get_once(&key).await.unwrap(), Some(json!({"n": 10})));
    }

    #[tokio::test]
    async fn test_subscribers_see_commits_in_order() {
        let store = store().await;
        let key = DocumentKey::feed("store-1", "North");
        store.create_if_missing(&key, json!({"queue": []})).await.unwrap();

        let mut sub = store.subscribe(&key).await.unwrap();
        assert_eq!(sub.current(), Some(json!({"queue": []})));

        store
            .overwrite_fields(&key, json!({"queue": [{"id": "a"}]}))
            .await
            .unwrap();
        let seen = sub.changed().await.unwrap();
        assert_eq!(seen, Some(json!({"queue": [{"id": "a"}]})));

        drop(sub);
        assert_eq!(store.subscriber_count(&key), 0);
    }

    #[tokio::test]
    async fn test_rejects_non_object_documents() {
        let store = store().await;
        let key = DocumentKey::new("k");
        assert!(matches!(
            store.create_if_missing(&key, json!([1, 2])).await,
            Err(AppError::Validation(_))
        ));
    }
}
