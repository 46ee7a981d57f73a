// Stage transitions applied to a feed document in memory
//
// Each function either changes the feed and returns what happened, or
// returns None and leaves the feed untouched (entry not where expected).
// Nothing here does I/O or reads a clock; ids and timestamps come in as
// arguments so a transaction retry replays the same change.

use serde::{Deserialize, Serialize};

use crate::application::attribution::merge_managers;
use crate::application::reinsertion::{place, Placement, Position};
use crate::domain::{EarlyReason, Entry, EntryId, FeedDocument, FeedList, JoinType};

/// Result of completing a visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedVisit {
    /// Id of the record appended to `completed`
    pub completed_id: EntryId,
    /// Fresh id of the guest's new waiting entry
    pub requeued_id: EntryId,
    pub placement: Placement,
}

pub fn enqueue(feed: &mut FeedDocument, entry: Entry) {
    feed.queue.push(entry);
}

/// Move a waiting entry into service. Returns the index it left.
pub fn begin_service(
    feed: &mut FeedDocument,
    entry_id: &str,
    join_type: JoinType,
    now_millis: i64,
) -> Option<usize> {
    let (index, mut entry) = feed.take(FeedList::Queue, entry_id)?;
    entry.start_service(now_millis, join_type, index);
    feed.active.push(entry);
    Some(index)
}

/// Return an in-service entry to the waiting list without completing it
pub fn send_back(
    feed: &mut FeedDocument,
    entry_id: &str,
    requested: Position,
    managers: &[String],
    now_millis: i64,
) -> Option<Placement> {
    let (_, mut entry) = feed.take(FeedList::Active, entry_id)?;
    let placement = place(requested, &entry, feed.queue.len(), now_millis);

    entry.clear_service();
    if !managers.is_empty() {
        entry.managers = merge_managers(entry.managers.as_deref(), managers);
    }
    feed.queue.insert(placement.index, entry);
    Some(placement)
}

/// Finish a visit: archive it to `completed` and put a fresh waiting entry
/// for the same guest into line.
///
/// `early_reason` is kept only when the visit actually lands back in its
/// original slot.
pub fn complete_visit(
    feed: &mut FeedDocument,
    entry_id: &str,
    requested: Position,
    managers: &[String],
    early_reason: Option<EarlyReason>,
    requeued_id: EntryId,
    now_millis: i64,
) -> Option<CompletedVisit> {
    let (_, mut record) = feed.take(FeedList::Active, entry_id)?;
    let placement = place(requested, &record, feed.queue.len(), now_millis);

    let requeued = record.requeued(requeued_id.clone(), now_millis);
    feed.queue.insert(placement.index, requeued);

    record.managers = merge_managers(record.managers.as_deref(), managers);
    record.completed_at = Some(now_millis);
    record.early_reason = match placement.position {
        Position::Original => early_reason,
        Position::Bottom => None,
    };
    let completed_id = record.id.clone();
    feed.completed.push(record);

    Some(CompletedVisit {
        completed_id,
        requeued_id,
        placement,
    })
}

/// Drop an entry from a list by id
pub fn remove(feed: &mut FeedDocument, list: FeedList, entry_id: &str) -> Option<Entry> {
    feed.take(list, entry_id).map(|(_, entry)| entry)
}

/// Empty the waiting list, returning how many entries were dropped
pub fn clear_queue(feed: &mut FeedDocument) -> usize {
    std::mem::take(&mut feed.queue).len()
}

/// Set or clear (blank label) the team label of an in-service entry
pub fn set_team_label(feed: &mut FeedDocument, entry_id: &str, label: &str) -> Option<()> {
    let index = feed.position(FeedList::Active, entry_id)?;
    let label = label.trim();
    feed.active[index].team_label = if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    };
    Some(())
}
