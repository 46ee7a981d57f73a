// Queue Controller - the stage state machine over the shared feed
//
// waiting -> in service -> completed + requeued, or back to waiting.
// Every mutation goes through FeedSync::mutate, which writes all three
// lists together. A missing entry (another client already moved it) is a
// benign no-op reported as `None`/`false`, never an error.

pub mod transitions;

#[cfg(test)]
mod lifecycle_test;

pub use transitions::CompletedVisit;

use crate::application::attribution::{AttributionResolver, ManagerSelection};
use crate::application::feed_sync::FeedSync;
use crate::application::reinsertion::{Placement, Position};
use crate::domain::{normalize_name, EarlyReason, Entry, FeedDocument, FeedKey, FeedList, JoinType};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, RosterStore, TimeProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct QueueController {
    sync: Arc<FeedSync>,
    roster: Arc<dyn RosterStore>,
    attribution: AttributionResolver,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl QueueController {
    pub fn new(
        sync: Arc<FeedSync>,
        roster: Arc<dyn RosterStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            sync,
            attribution: AttributionResolver::new(roster.clone()),
            roster,
            id_provider,
            time_provider,
        }
    }

    /// Attach to a feed and make sure the location's roster documents exist
    pub async fn open(&self, key: FeedKey) -> Result<()> {
        self.roster.init_if_missing(&key.location_id).await?;
        self.sync.attach(key).await
    }

    pub fn key(&self) -> Option<FeedKey> {
        self.sync.key()
    }

    pub fn snapshot(&self) -> FeedDocument {
        self.sync.snapshot()
    }

    pub fn feed_sync(&self) -> &Arc<FeedSync> {
        &self.sync
    }

    pub fn roster(&self) -> &Arc<dyn RosterStore> {
        &self.roster
    }

    fn location_id(&self) -> Result<String> {
        self.sync
            .key()
            .map(|k| k.location_id)
            .ok_or_else(|| AppError::InvalidState("No feed attached".to_string()))
    }

    /// Roster names are only resolved for entries still being served
    fn in_service(&self, entry_id: &str) -> bool {
        self.sync.snapshot().position(FeedList::Active, entry_id).is_some()
    }

    /// Add a guest to the bottom of the line. A blank first name is a no-op.
    pub async fn enqueue(&self, first_name: &str, last_name: &str, note: &str) -> Result<Option<Entry>> {
        let first_name = normalize_name(first_name);
        if first_name.is_empty() {
            debug!("Enqueue ignored: empty first name");
            return Ok(None);
        }
        let last_name = normalize_name(last_name);
        let location_id = self.location_id()?;

        let entry = Entry::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            first_name.clone(),
            last_name.clone(),
            note.trim(),
        );
        let added = entry.clone();
        self.sync
            .mutate(move |feed| {
                transitions::enqueue(feed, added.clone());
                Some(())
            })
            .await?;
        info!(entry_id = %entry.id, name = %entry.full_name(), "Guest joined the line");

        // Remembering the name is best effort; the guest is already in line
        if let Err(e) = self
            .roster
            .add_saved_name(&location_id, &first_name, &last_name)
            .await
        {
            warn!(location_id = %location_id, error = %e, "Failed to record saved name");
        }
        Ok(Some(entry))
    }

    /// Start serving a waiting guest. Returns the line index they left.
    pub async fn begin_service(&self, entry_id: &str, join_type: JoinType) -> Result<Option<usize>> {
        let now = self.time_provider.now_millis();
        let index = self
            .sync
            .mutate(|feed| transitions::begin_service(feed, entry_id, join_type, now))
            .await?;

        match index {
            Some(index) => info!(entry_id = %entry_id, index, join_type = %join_type, "Service started"),
            None => debug!(entry_id = %entry_id, "Begin service ignored: entry not waiting"),
        }
        Ok(index)
    }

    /// Put an in-service guest back in line without completing the visit
    pub async fn send_back(
        &self,
        entry_id: &str,
        position: Position,
        managers: &ManagerSelection,
    ) -> Result<Option<Placement>> {
        let location_id = self.location_id()?;
        if !self.in_service(entry_id) {
            debug!(entry_id = %entry_id, "Send back ignored: entry not in service");
            return Ok(None);
        }
        let names = self.attribution.resolve(&location_id, managers).await?;
        let now = self.time_provider.now_millis();

        let placement = self
            .sync
            .mutate(|feed| transitions::send_back(feed, entry_id, position, &names, now))
            .await?;

        match placement {
            Some(p) => info!(
                entry_id = %entry_id,
                position = %p.position,
                index = p.index,
                "Guest sent back to the line"
            ),
            None => debug!(entry_id = %entry_id, "Send back ignored: entry not in service"),
        }
        Ok(placement)
    }

    /// Complete a visit and requeue the guest under a new id
    pub async fn complete_visit(
        &self,
        entry_id: &str,
        managers: &ManagerSelection,
        position: Position,
        early_reason: Option<EarlyReason>,
    ) -> Result<Option<CompletedVisit>> {
        let location_id = self.location_id()?;
        if !self.in_service(entry_id) {
            debug!(entry_id = %entry_id, "Complete ignored: entry not in service");
            return Ok(None);
        }
        let names = self.attribution.resolve(&location_id, managers).await?;
        let requeued_id = self.id_provider.generate_id();
        let now = self.time_provider.now_millis();

        let visit = self
            .sync
            .mutate(|feed| {
                transitions::complete_visit(
                    feed,
                    entry_id,
                    position,
                    &names,
                    early_reason,
                    requeued_id.clone(),
                    now,
                )
            })
            .await?;

        match &visit {
            Some(v) => info!(
                entry_id = %v.completed_id,
                requeued_id = %v.requeued_id,
                position = %v.placement.position,
                index = v.placement.index,
                managers = ?names,
                "Visit completed"
            ),
            None => debug!(entry_id = %entry_id, "Complete ignored: entry not in service"),
        }
        Ok(visit)
    }

    pub async fn remove_from_queue(&self, entry_id: &str) -> Result<bool> {
        self.remove(FeedList::Queue, entry_id).await
    }

    pub async fn remove_completed(&self, entry_id: &str) -> Result<bool> {
        self.remove(FeedList::Completed, entry_id).await
    }

    async fn remove(&self, list: FeedList, entry_id: &str) -> Result<bool> {
        let removed = self
            .sync
            .mutate(|feed| transitions::remove(feed, list, entry_id))
            .await?;
        if removed.is_some() {
            info!(entry_id = %entry_id, list = list.as_str(), "Entry removed");
        } else {
            debug!(entry_id = %entry_id, list = list.as_str(), "Remove ignored: entry absent");
        }
        Ok(removed.is_some())
    }

    /// Empty the waiting list. Confirmation is the caller's job.
    pub async fn clear_queue(&self) -> Result<usize> {
        let cleared = self
            .sync
            .mutate(|feed| Some(transitions::clear_queue(feed)))
            .await?
            .unwrap_or(0);
        info!(removed = cleared, "Waiting list cleared");
        Ok(cleared)
    }

    pub async fn set_team_label(&self, entry_id: &str, label: &str) -> Result<bool> {
        let updated = self
            .sync
            .mutate(|feed| transitions::set_team_label(feed, entry_id, label))
            .await?
            .is_some();
        if updated {
            debug!(entry_id = %entry_id, "Team label updated");
        }
        Ok(updated)
    }

    pub async fn switch_region(&self, region: &str) -> Result<FeedKey> {
        let region = region.trim();
        if region.is_empty() {
            return Err(AppError::Validation("Region must not be empty".to_string()));
        }
        let key = self.sync.switch_region(region).await?;
        info!(location_id = %key.location_id, region = %key.region, "Region switched");
        Ok(key)
    }
}
