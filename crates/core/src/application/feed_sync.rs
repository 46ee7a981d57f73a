//! Feed Sync - keeps the local copy of one feed document and writes it back
//!
//! One long-lived subscription per attached (location, region). Every pushed
//! version replaces the whole local snapshot; there is no field-level merge.
//! Switching region aborts the old subscription before the new one starts
//! publishing, so nothing from the old region arrives afterwards. Entries
//! stored without an id get one written back when the feed is opened.

use crate::domain::{FeedDocument, FeedKey};
use crate::error::{AppError, Result};
use crate::port::{DocumentStore, IdProvider};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How mutations reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Compute from the local snapshot, then overwrite all three lists in
    /// one write. Two clients acting on the same stale snapshot can lose
    /// each other's change (last write wins).
    #[default]
    Overwrite,
    /// Read-modify-write inside a store transaction against the freshest
    /// stored document.
    Transactional,
}

struct Attachment {
    key: FeedKey,
    pump: JoinHandle<()>,
}

pub struct FeedSync {
    store: Arc<dyn DocumentStore>,
    id_provider: Arc<dyn IdProvider>,
    write_mode: WriteMode,
    snapshot: Arc<watch::Sender<FeedDocument>>,
    generation: Arc<AtomicU64>,
    attempts: AtomicU64,
    attachment: Mutex<Option<Attachment>>,
}

impl FeedSync {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        id_provider: Arc<dyn IdProvider>,
        write_mode: WriteMode,
    ) -> Self {
        let (tx, _rx) = watch::channel(FeedDocument::default());
        Self {
            store,
            id_provider,
            write_mode,
            snapshot: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            attempts: AtomicU64::new(0),
            attachment: Mutex::new(None),
        }
    }

    /// Feed currently attached, if any
    pub fn key(&self) -> Option<FeedKey> {
        self.lock_attachment().as_ref().map(|a| a.key.clone())
    }

    /// Latest local snapshot
    pub fn snapshot(&self) -> FeedDocument {
        self.snapshot.borrow().clone()
    }

    /// Wait until the local snapshot satisfies `pred`
    pub async fn wait_for<P>(&self, mut pred: P) -> FeedDocument
    where
        P: FnMut(&FeedDocument) -> bool,
    {
        let mut rx = self.snapshot.subscribe();
        let feed = match rx.wait_for(|feed| pred(feed)).await {
            Ok(feed) => feed.clone(),
            // The sender lives as long as self
            Err(_) => self.snapshot(),
        };
        feed
    }

    /// Open the feed for `key`, creating it if missing, and start following
    /// it. The previous subscription is only torn down once the new one is
    /// open; a failed attach leaves the current feed attached.
    pub async fn attach(&self, key: FeedKey) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let doc_key = key.document_key();
        let id_provider = self.id_provider.clone();
        self.store
            .create_if_missing(&doc_key, FeedDocument::empty_document())
            .await?;
        self.store
            .transact(&doc_key, &mut |current| {
                let Some(mut doc) = current else {
                    return Ok(None);
                };
                let changed =
                    FeedDocument::assign_missing_ids(&mut doc, &mut || id_provider.generate_id());
                Ok(changed.then_some(doc))
            })
            .await?;
        let mut subscription = self.store.subscribe(&doc_key).await?;

        if self.attempts.load(Ordering::SeqCst) != attempt {
            debug!(feed = %key, "Attach superseded by a newer one");
            return Ok(());
        }

        let mut attachment = self.lock_attachment();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(old) = attachment.take() {
            old.pump.abort();
            info!(feed = %old.key, "Feed subscription closed");
        }

        let initial = self.read(subscription.current().as_ref());
        self.snapshot.send_replace(initial);

        let snapshot = self.snapshot.clone();
        let current = self.generation.clone();
        let feed = key.clone();
        let pump = tokio::spawn(async move {
            while let Some(doc) = subscription.changed().await {
                if current.load(Ordering::SeqCst) != generation {
                    break;
                }
                let next = FeedDocument::from_document(doc.as_ref(), &mut || {
                    id_provider.generate_id()
                });
                debug!(
                    feed = %feed,
                    queue = next.queue.len(),
                    active = next.active.len(),
                    completed = next.completed.len(),
                    "Feed snapshot received"
                );
                snapshot.send_replace(next);
            }
            debug!(feed = %feed, "Feed subscription ended");
        });

        info!(feed = %key, "Feed subscription opened");
        *attachment = Some(Attachment { key, pump });
        Ok(())
    }

    /// Move to another region of the same location
    pub async fn switch_region(&self, region: impl Into<String>) -> Result<FeedKey> {
        let key = self
            .key()
            .ok_or_else(|| AppError::InvalidState("No feed attached".to_string()))?
            .with_region(region);
        self.attach(key.clone()).await?;
        Ok(key)
    }

    /// Apply `f` to the feed and write the result back as one whole
    /// document. `f` returning `None` means nothing to do (for example the
    /// entry was already moved by another client); no write happens.
    ///
    /// A failed write is returned as an error. In overwrite mode the local
    /// snapshot already shows the change and is not rolled back; the next
    /// pushed version corrects it.
    pub async fn mutate<T, F>(&self, mut f: F) -> Result<Option<T>>
    where
        T: Send,
        F: FnMut(&mut FeedDocument) -> Option<T> + Send,
    {
        let key = self
            .key()
            .ok_or_else(|| AppError::InvalidState("No feed attached".to_string()))?;
        let doc_key = key.document_key();

        match self.write_mode {
            WriteMode::Overwrite => {
                let mut feed = self.snapshot();
                let Some(out) = f(&mut feed) else {
                    return Ok(None);
                };
                feed.check_exclusive()?;
                let doc = feed.to_document()?;

                self.snapshot.send_replace(feed);
                if let Err(e) = self.store.overwrite_fields(&doc_key, doc).await {
                    warn!(feed = %key, error = %e, "Feed write failed");
                    return Err(e);
                }
                Ok(Some(out))
            }
            WriteMode::Transactional => {
                let generation = self.generation.load(Ordering::SeqCst);
                let id_provider = self.id_provider.clone();
                let mut out: Option<T> = None;
                let mut committed: Option<FeedDocument> = None;

                let result = self
                    .store
                    .transact(&doc_key, &mut |current| {
                        let mut feed = FeedDocument::from_document(current.as_ref(), &mut || {
                            id_provider.generate_id()
                        });
                        out = f(&mut feed);
                        if out.is_none() {
                            committed = None;
                            return Ok(None);
                        }
                        feed.check_exclusive()?;
                        let doc = feed.to_document()?;
                        committed = Some(feed);
                        Ok(Some(doc))
                    })
                    .await;

                if let Err(e) = result {
                    warn!(feed = %key, error = %e, "Feed transaction failed");
                    return Err(e);
                }
                if let Some(feed) = committed {
                    if self.generation.load(Ordering::SeqCst) == generation {
                        self.snapshot.send_replace(feed);
                    }
                }
                Ok(out)
            }
        }
    }

    fn read(&self, doc: Option<&serde_json::Value>) -> FeedDocument {
        FeedDocument::from_document(doc, &mut || self.id_provider.generate_id())
    }

    fn lock_attachment(&self) -> std::sync::MutexGuard<'_, Option<Attachment>> {
        self.attachment.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for FeedSync {
    fn drop(&mut self) {
        if let Some(old) = self.lock_attachment().take() {
            old.pump.abort();
        }
    }
}
