// Shared Document Store Port (Interface)
//
// One JSON document per key. Feed documents are written whole; roster
// documents go through `transact` so concurrent upserts never lose rows.

use crate::domain::DocumentKey;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::watch;

/// Stored document body
pub type Document = Value;

/// Read-modify-write step run inside a store transaction.
///
/// Receives the current document (`None` if missing) and returns the next
/// one, or `None` to leave the document untouched. May be called more than
/// once if the store retries.
pub type TransactFn<'a> = dyn FnMut(Option<Document>) -> Result<Option<Document>> + Send + 'a;

/// Push subscription to one document.
///
/// Dropping it (or calling `unsubscribe`) ends delivery; nothing is pushed
/// afterwards.
pub struct Subscription {
    rx: watch::Receiver<Option<Document>>,
}

impl Subscription {
    pub fn new(rx: watch::Receiver<Option<Document>>) -> Self {
        Self { rx }
    }

    /// Latest known version of the document
    pub fn current(&self) -> Option<Document> {
        self.rx.borrow().clone()
    }

    /// Wait for the next version. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Option<Document>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {}
}

/// Shared document store interface
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the document from `default` if it does not exist; if it does,
    /// only top-level fields absent from it are filled in.
    async fn create_if_missing(&self, key: &DocumentKey, default: Document) -> Result<()>;

    /// Read the document once
    async fn get_once(&self, key: &DocumentKey) -> Result<Option<Document>>;

    /// Subscribe to every new version of the document
    async fn subscribe(&self, key: &DocumentKey) -> Result<Subscription>;

    /// Replace the given top-level fields in one atomic write.
    /// Fails with `NotFound` if the document does not exist.
    async fn overwrite_fields(&self, key: &DocumentKey, partial: Document) -> Result<()>;

    /// Atomic read-modify-write. Returns the document as committed.
    async fn transact(&self, key: &DocumentKey, f: &mut TransactFn<'_>) -> Result<Option<Document>>;
}

/// Merge the top-level fields of `partial` into `target` (both objects).
/// Returns false when either side is not an object.
pub fn merge_fields(target: &mut Document, partial: &Document) -> bool {
    match (target.as_object_mut(), partial.as_object()) {
        (Some(target), Some(partial)) => {
            for (field, value) in partial {
                target.insert(field.clone(), value.clone());
            }
            true
        }
        _ => false,
    }
}

/// Fill in top-level fields of `defaults` that `target` lacks.
/// Returns true if anything was added.
pub fn fill_missing_fields(target: &mut Document, defaults: &Document) -> bool {
    let (Some(target), Some(defaults)) = (target.as_object_mut(), defaults.as_object()) else {
        return false;
    };
    let mut changed = false;
    for (field, value) in defaults {
        if !target.contains_key(field) {
            target.insert(field.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Per-key broadcast of the latest document version, shared by store
/// implementations that serve subscriptions in-process.
#[derive(Default)]
pub struct SnapshotHub {
    channels: Mutex<HashMap<DocumentKey, watch::Sender<Option<Document>>>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription. `current` seeds the channel the first time a
    /// key is watched; callers must read it under the same lock they
    /// publish with.
    pub fn subscribe(&self, key: &DocumentKey, current: Option<Document>) -> Subscription {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        match channels.get(key) {
            Some(tx) if tx.receiver_count() > 0 => Subscription::new(tx.subscribe()),
            _ => {
                let (tx, rx) = watch::channel(current);
                channels.insert(key.clone(), tx);
                Subscription::new(rx)
            }
        }
    }

    /// Push a new version to every live subscriber of `key`
    pub fn publish(&self, key: &DocumentKey, doc: Option<Document>) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = channels.get(key) {
            if tx.receiver_count() == 0 {
                channels.remove(key);
                return;
            }
            tx.send_replace(doc);
        }
    }

    pub fn subscriber_count(&self, key: &DocumentKey) -> usize {
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.get(key).map(|tx| tx.receiver_count()).unwrap_or(0)
    }
}

// ============================================================================
// In-Memory Implementation for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Process-local document store. Writes are serialized by one lock,
    /// which also makes `transact` atomic.
    #[derive(Default)]
    pub struct InMemoryDocumentStore {
        docs: Mutex<HashMap<DocumentKey, Document>>,
        hub: SnapshotHub,
        fail_writes: AtomicBool,
        writes: AtomicUsize,
    }

    impl InMemoryDocumentStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every following write fail (simulates a lost connection)
        pub fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Number of successful writes so far
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn subscriber_count(&self, key: &DocumentKey) -> usize {
            self.hub.subscriber_count(key)
        }

        fn check_writable(&self) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(AppError::Store("write rejected: store unavailable".to_string()));
            }
            Ok(())
        }

        fn commit(
            &self,
            docs: &mut HashMap<DocumentKey, Document>,
            key: &DocumentKey,
            doc: Document,
        ) {
            docs.insert(key.clone(), doc.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.hub.publish(key, Some(doc));
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DocumentKey, Document>> {
            self.docs.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    #[async_trait]
    impl DocumentStore for InMemoryDocumentStore {
        async fn create_if_missing(&self, key: &DocumentKey, default: Document) -> Result<()> {
            self.check_writable()?;
            let mut docs = self.lock();
            match docs.get(key).cloned() {
                None => self.commit(&mut docs, key, default),
                Some(mut existing) => {
                    if fill_missing_fields(&mut existing, &default) {
                        self.commit(&mut docs, key, existing);
                    }
                }
            }
            Ok(())
        }

        async fn get_once(&self, key: &DocumentKey) -> Result<Option<Document>> {
            Ok(self.lock().get(key).cloned())
        }

        async fn subscribe(&self, key: &DocumentKey) -> Result<Subscription> {
            let docs = self.lock();
            Ok(self.hub.subscribe(key, docs.get(key).cloned()))
        }

        async fn overwrite_fields(&self, key: &DocumentKey, partial: Document) -> Result<()> {
            self.check_writable()?;
            let mut docs = self.lock();
            let mut doc = docs
                .get(key)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Document {} not found", key)))?;
            if !merge_fields(&mut doc, &partial) {
                return Err(AppError::Validation(format!(
                    "Document {} update must be an object",
                    key
                )));
            }
            self.commit(&mut docs, key, doc);
            Ok(())
        }

        async fn transact(
            &self,
            key: &DocumentKey,
            f: &mut TransactFn<'_>,
        ) -> Result<Option<Document>> {
            self.check_writable()?;
            let mut docs = self.lock();
            let current = docs.get(key).cloned();
            match f(current.clone())? {
                Some(next) => {
                    self.commit(&mut docs, key, next.clone());
                    Ok(Some(next))
                }
                None => Ok(current),
            }
        }
    }
}
