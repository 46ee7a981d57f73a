//! Controller tests against the in-memory store

use super::*;
use crate::application::feed_sync::WriteMode;
use crate::application::reinsertion::ORIGINAL_SLOT_WINDOW_MS;
use crate::application::roster::DocumentRoster;
use crate::port::document_store::mocks::InMemoryDocumentStore;
use crate::port::id_provider::mocks::SequentialIds;
use crate::port::time_provider::mocks::ManualClock;
use crate::port::DocumentStore;

const T: i64 = 1_700_000_000_000;

struct Harness {
    store: Arc<InMemoryDocumentStore>,
    clock: Arc<ManualClock>,
    controller: QueueController,
}

async fn harness(mode: WriteMode) -> Harness {
    let store = Arc::new(InMemoryDocumentStore::new());
    let clock = Arc::new(ManualClock::new(T));
    let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new("e"));
    let roster = Arc::new(DocumentRoster::new(store.clone(), Arc::new(SequentialIds::new("r"))));
    let sync = Arc::new(FeedSync::new(store.clone(), ids.clone(), mode));
    let controller = QueueController::new(sync, roster, ids, clock.clone());
    controller
        .open(FeedKey::new("store-1", "North"))
        .await
        .unwrap();
    Harness {
        store,
        clock,
        controller,
    }
}

fn stored(feed: &serde_json::Value) -> FeedDocument {
    FeedDocument::from_document(Some(feed), &mut || "unused".to_string())
}

#[tokio::test]
async fn test_enqueue_begin_send_back_round_trip() {
    let h = harness(WriteMode::Overwrite).await;
    let c = &h.controller;

    let ana = c.enqueue("Ana", "Lee", "").await.unwrap().unwrap();
    let feed = c.snapshot();
    assert_eq!(feed.queue.len(), 1);
    assert_eq!(feed.queue[0].full_name(), "Ana Lee");
    assert_eq!(feed.queue[0].joined_at, Some(T));

    h.clock.advance(10_000);
    assert_eq!(c.begin_service(&ana.id, JoinType::WalkIn).await.unwrap(), Some(0));
    let feed = c.snapshot();
    assert!(feed.queue.is_empty());
    assert_eq!(feed.active[0].service_start, Some(T + 10_000));
    assert_eq!(feed.active[0].original_queue_index, Some(0));

    h.clock.advance(50_000);
    let placement = c
        .send_back(&ana.id, Position::Original, &ManagerSelection::none())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(placement.position, Position::Original);

    let feed = c.snapshot();
    assert!(feed.active.is_empty());
    assert_eq!(feed.queue[0].id, ana.id);
    assert!(feed.queue[0].service_start.is_none());
}

#[tokio::test]
async fn test_complete_after_window_requeues_at_tail() {
    let h = harness(WriteMode::Overwrite).await;
    let c = &h.controller;

    let ana = c.enqueue("Ana", "Lee", "").await.unwrap().unwrap();
    c.enqueue("Bo", "Kay", "").await.unwrap();
    c.begin_service(&ana.id, JoinType::WalkIn).await.unwrap();
    h.clock.advance(200_000);

    let visit = c
        .complete_visit(&ana.id, &ManagerSelection::typed("Sam"), Position::Original, None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(visit.placement.position, Position::Bottom);
    assert_ne!(visit.requeued_id, visit.completed_id);

    let feed = c.snapshot();
    assert_eq!(feed.completed[0].managers, Some(vec!["Sam".to_string()]));
    assert_eq!(feed.queue.last().map(|e| e.id.clone()), Some(visit.requeued_id.clone()));
    assert!(feed.stage_of(&ana.id).is_none());

    let roster = c.roster().managers("store-1").await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].name, "Sam");
}

#[tokio::test]
async fn test_send_back_past_window_forces_bottom() {
    let h = harness(WriteMode::Overwrite).await;
    let c = &h.controller;

    let ana = c.enqueue("Ana", "", "").await.unwrap().unwrap();
    let bo = c.enqueue("Bo", "", "").await.unwrap().unwrap();
    c.begin_service(&ana.id, JoinType::WalkIn).await.unwrap();
    h.clock.advance(ORIGINAL_SLOT_WINDOW_MS);

    let placement = c
        .send_back(&ana.id, Position::Original, &ManagerSelection::none())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(placement.position, Position::Bottom);
    let order: Vec<String> = c.snapshot().queue.into_iter().map(|e| e.id).collect();
    assert_eq!(order, vec![bo.id, ana.id]);
}

#[tokio::test]
async fn test_blank_first_name_is_noop() {
    let h = harness(WriteMode::Overwrite).await;
    let writes = h.store.write_count();

    assert!(h.controller.enqueue("   ", "Lee", "").await.unwrap().is_none());

    assert_eq!(h.store.write_count(), writes);
    assert!(h.controller.snapshot().queue.is_empty());
}

#[tokio::test]
async fn test_enqueue_remembers_name() {
    let h = harness(WriteMode::Overwrite).await;
    h.controller.enqueue(" Ana ", "Lee", "").await.unwrap();
    h.controller.enqueue("ana", "LEE", "").await.unwrap();

    let names = h.controller.roster().saved_names("store-1").await.unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].first_name, "Ana");
}

#[tokio::test]
async fn test_actions_on_moved_entries_are_noops() {
    let h = harness(WriteMode::Overwrite).await;
    let c = &h.controller;
    let ana = c.enqueue("Ana", "", "").await.unwrap().unwrap();
    let writes = h.store.write_count();

    assert!(c
        .send_back(&ana.id, Position::Bottom, &ManagerSelection::none())
        .await
        .unwrap()
        .is_none());
    assert!(c
        .complete_visit(&ana.id, &ManagerSelection::none(), Position::Bottom, None)
        .await
        .unwrap()
        .is_none());
    assert!(!c.set_team_label(&ana.id, "Sam").await.unwrap());
    assert!(!c.remove_completed(&ana.id).await.unwrap());
    assert!(c.begin_service("missing", JoinType::WalkIn).await.unwrap().is_none());

    assert_eq!(h.store.write_count(), writes);
}

#[tokio::test]
async fn test_typed_helper_on_missing_entry_leaves_roster_alone() {
    let h = harness(WriteMode::Overwrite).await;
    let c = &h.controller;
    let writes = h.store.write_count();

    let sent = c
        .send_back("gone", Position::Original, &ManagerSelection::typed("Brand New"))
        .await
        .unwrap();
    let done = c
        .complete_visit("gone", &ManagerSelection::typed("Brand New"), Position::Bottom, None)
        .await
        .unwrap();

    assert!(sent.is_none());
    assert!(done.is_none());
    assert!(c.roster().managers("store-1").await.unwrap().is_empty());
    assert_eq!(h.store.write_count(), writes);
}

#[tokio::test]
async fn test_legacy_entry_without_id_can_be_served() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let key = FeedKey::new("store-1", "North");
    store
        .create_if_missing(
            &key.document_key(),
            serde_json::json!({"queue": [{"firstName": "Ana"}], "active": [], "completed": []}),
        )
        .await
        .unwrap();
    let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new("e"));
    let roster = Arc::new(DocumentRoster::new(store.clone(), Arc::new(SequentialIds::new("r"))));
    let sync = Arc::new(FeedSync::new(store.clone(), ids.clone(), WriteMode::Transactional));
    let c = QueueController::new(sync, roster, ids, Arc::new(ManualClock::new(T)));
    c.open(key.clone()).await.unwrap();

    let ana = c.snapshot().queue[0].clone();
    assert_eq!(c.begin_service(&ana.id, JoinType::WalkIn).await.unwrap(), Some(0));

    let doc = store.get_once(&key.document_key()).await.unwrap().unwrap();
    let feed = stored(&doc);
    assert_eq!(feed.active[0].id, ana.id);
    assert_eq!(feed.active[0].first_name, "Ana");
}

#[tokio::test]
async fn test_every_write_carries_all_three_lists() {
    let h = harness(WriteMode::Overwrite).await;
    let c = &h.controller;
    let key = FeedKey::new("store-1", "North").document_key();

    let ana = c.enqueue("Ana", "", "").await.unwrap().unwrap();
    c.begin_service(&ana.id, JoinType::Appointment).await.unwrap();
    c.set_team_label(&ana.id, "Sam Ho & Kim Li").await.unwrap();

    let doc = h.store.get_once(&key).await.unwrap().unwrap();
    let feed = stored(&doc);
    assert!(feed.queue.is_empty());
    assert_eq!(feed.active[0].team_label.as_deref(), Some("Sam Ho & Kim Li"));
    assert!(feed.check_exclusive().is_ok());
}

#[tokio::test]
async fn test_remove_and_clear() {
    let h = harness(WriteMode::Transactional).await;
    let c = &h.controller;

    let ana = c.enqueue("Ana", "", "").await.unwrap().unwrap();
    c.enqueue("Bo", "", "").await.unwrap();
    c.enqueue("Cy", "", "").await.unwrap();

    assert!(c.remove_from_queue(&ana.id).await.unwrap());
    assert!(!c.remove_from_queue(&ana.id).await.unwrap());
    assert_eq!(c.clear_queue().await.unwrap(), 2);
    assert_eq!(c.clear_queue().await.unwrap(), 0);
    assert!(c.snapshot().queue.is_empty());
}

#[tokio::test]
async fn test_write_failure_surfaces_and_keeps_local_change() {
    let h = harness(WriteMode::Overwrite).await;
    h.store.set_fail_writes(true);

    let err = h.controller.enqueue("Ana", "", "").await.unwrap_err();

    assert!(matches!(err, AppError::Store(_)));
    assert_eq!(h.controller.snapshot().queue.len(), 1);
}

#[tokio::test]
async fn test_switch_region_rejects_blank() {
    let h = harness(WriteMode::Overwrite).await;
    assert!(matches!(
        h.controller.switch_region("  ").await,
        Err(AppError::Validation(_))
    ));
    let key = h.controller.switch_region("South").await.unwrap();
    assert_eq!(key.region, "South");
    assert_eq!(h.controller.key(), Some(key));
}
