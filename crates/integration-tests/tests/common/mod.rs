//! Shared wiring for the integration suites: a real SQLite store under the
//! engine, with a controllable clock.

#![allow(dead_code)]

use queueline_core::application::{DocumentRoster, FeedSync, QueueController, WriteMode};
use queueline_core::domain::{FeedDocument, FeedKey};
use queueline_core::port::id_provider::mocks::SequentialIds;
use queueline_core::port::time_provider::mocks::ManualClock;
use queueline_core::port::{DocumentStore, IdProvider, RosterStore};
use queueline_infra_sqlite::{create_pool, run_migrations, SqliteDocumentStore};
use std::sync::Arc;

pub const T: i64 = 1_700_000_000_000;

pub async fn sqlite_store(clock: Arc<ManualClock>) -> Arc<SqliteDocumentStore> {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    Arc::new(SqliteDocumentStore::new(pool, clock))
}

/// One staff client: its own sync adapter and controller over a shared store
pub async fn client(
    store: Arc<dyn DocumentStore>,
    clock: Arc<ManualClock>,
    id_prefix: &str,
    mode: WriteMode,
) -> QueueController {
    let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new(id_prefix));
    let roster: Arc<dyn RosterStore> = Arc::new(DocumentRoster::new(store.clone(), ids.clone()));
    let sync = Arc::new(FeedSync::new(store, ids.clone(), mode));
    let controller = QueueController::new(sync, roster, ids, clock);
    controller.open(FeedKey::new("store-1", "North")).await.unwrap();
    controller
}

/// The feed as currently persisted, read straight from the store
pub async fn persisted(store: &dyn DocumentStore, key: &FeedKey) -> FeedDocument {
    let doc = store.get_once(&key.document_key()).await.unwrap();
    FeedDocument::from_document(doc.as_ref(), &mut || "unexpected".to_string())
}

pub fn names(entries: &[queueline_core::domain::Entry]) -> Vec<String> {
    entries.iter().map(|e| e.full_name()).collect()
}
