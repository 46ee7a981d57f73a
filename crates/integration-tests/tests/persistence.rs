//! Documents outlive the process: a file-backed store reopened after close

mod common;

use common::{client, names, T};
use queueline_core::application::WriteMode;
use queueline_core::domain::{FeedKey, JoinType};
use queueline_core::port::time_provider::mocks::ManualClock;
use queueline_core::port::RosterStore;
use queueline_infra_sqlite::{create_pool, run_migrations, SqliteDocumentStore};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn db_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("queueline_{}_{}.db", name, std::process::id()));
    cleanup(&path);
    path
}

fn cleanup(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

async fn open(path: &Path, clock: Arc<ManualClock>) -> (SqlitePool, Arc<SqliteDocumentStore>) {
    let pool = create_pool(&format!("sqlite://{}", path.display())).await.unwrap();
    run_migrations(&pool).await.unwrap();
    (pool.clone(), Arc::new(SqliteDocumentStore::new(pool, clock)))
}

#[tokio::test]
async fn test_feed_and_roster_survive_restart() {
    let path = db_path("restart");
    let clock = Arc::new(ManualClock::new(T));

    let ana_id = {
        let (pool, store) = open(&path, clock.clone()).await;
        let c = client(store, clock.clone(), "a", WriteMode::Overwrite).await;
        let ana = c.enqueue("Ana", "Lee", "blue sedan").await.unwrap().unwrap();
        c.enqueue("Bo", "", "").await.unwrap();
        c.begin_service(&ana.id, JoinType::Appointment).await.unwrap();
        c.roster().add_manager("store-1", "Sam Ho").await.unwrap();
        pool.close().await;
        ana.id
    };

    let (pool, store) = open(&path, clock.clone()).await;
    let c = client(store.clone(), clock, "b", WriteMode::Overwrite).await;
    let feed = c.snapshot();
    assert_eq!(names(&feed.queue), vec!["Bo"]);
    assert_eq!(feed.active[0].id, ana_id);
    assert_eq!(feed.active[0].note, "blue sedan");
    assert_eq!(feed.active[0].join_type, Some(JoinType::Appointment));

    let managers = c.roster().managers("store-1").await.unwrap();
    assert_eq!(managers[0].name, "Sam Ho");
    let saved = c.roster().saved_names("store-1").await.unwrap();
    assert_eq!(saved.len(), 2);

    // Reopening wrote nothing new to the feed
    let key = FeedKey::new("store-1", "North").document_key();
    assert_eq!(store.version(&key).await.unwrap(), 4);

    pool.close().await;
    cleanup(&path);
}

#[tokio::test]
async fn test_migrations_rerun_on_existing_file() {
    let path = db_path("migrate");
    let clock = Arc::new(ManualClock::new(T));

    let (pool, _) = open(&path, clock.clone()).await;
    pool.close().await;
    let (pool, _) = open(&path, clock).await;

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, 1);

    pool.close().await;
    cleanup(&path);
}
