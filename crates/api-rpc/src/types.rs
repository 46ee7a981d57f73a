//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results. Mutating methods
//! answer with the engine's `CommandOutcome` as-is.

use queueline_core::application::team_label::avatar_codes;
use queueline_core::application::{ManagerSelection, Position};
use queueline_core::domain::{EarlyReason, Entry, FeedDocument, FeedKey, JoinType, Manager, SavedName};
use serde::{Deserialize, Serialize};

/// feed.get.v1 - Current feed with display codes
#[derive(Debug, Default, Deserialize)]
pub struct FeedRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryView {
    pub entry: Entry,
    pub avatar_codes: Vec<String>,
}

impl From<Entry> for EntryView {
    fn from(entry: Entry) -> Self {
        Self {
            avatar_codes: avatar_codes(&entry),
            entry,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub location_id: Option<String>,
    pub region: Option<String>,
    pub queue: Vec<EntryView>,
    pub active: Vec<EntryView>,
    pub completed: Vec<EntryView>,
}

impl FeedResponse {
    pub fn new(key: Option<FeedKey>, feed: FeedDocument) -> Self {
        let views = |entries: Vec<Entry>| -> Vec<EntryView> {
            entries.into_iter().map(EntryView::from).collect()
        };
        Self {
            location_id: key.as_ref().map(|k| k.location_id.clone()),
            region: key.map(|k| k.region),
            queue: views(feed.queue),
            active: views(feed.active),
            completed: views(feed.completed),
        }
    }
}

/// feed.switch_region.v1
#[derive(Debug, Deserialize)]
pub struct SwitchRegionRequest {
    pub region: String,
}

/// queue.enqueue.v1
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub note: String,
}

/// queue.begin_service.v1
#[derive(Debug, Deserialize)]
pub struct BeginServiceRequest {
    pub entry_id: String,
    pub join_type: JoinType,
}

/// queue.send_back.v1
#[derive(Debug, Deserialize)]
pub struct SendBackRequest {
    pub entry_id: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub managers: ManagerSelection,
}

/// queue.complete_visit.v1
#[derive(Debug, Deserialize)]
pub struct CompleteVisitRequest {
    pub entry_id: String,
    #[serde(default)]
    pub managers: ManagerSelection,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub early_reason: Option<EarlyReason>,
}

/// queue.remove.v1 / completed.remove.v1
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub entry_id: String,
}

/// queue.clear.v1
#[derive(Debug, Default, Deserialize)]
pub struct ClearQueueRequest {}

/// active.team_label.v1 - empty label clears it
#[derive(Debug, Deserialize)]
pub struct TeamLabelRequest {
    pub entry_id: String,
    #[serde(default)]
    pub label: String,
}

/// roster.managers.list.v1 / roster.names.list.v1
///
/// `location_id` defaults to the daemon's location.
#[derive(Debug, Default, Deserialize)]
pub struct RosterRequest {
    #[serde(default)]
    pub location_id: Option<String>,
}

/// roster.managers.add.v1
#[derive(Debug, Deserialize)]
pub struct AddManagerRequest {
    #[serde(default)]
    pub location_id: Option<String>,
    pub name: String,
}

/// roster.names.add.v1
#[derive(Debug, Deserialize)]
pub struct AddSavedNameRequest {
    #[serde(default)]
    pub location_id: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// roster.names.remove.v1
#[derive(Debug, Deserialize)]
pub struct RemoveSavedNameRequest {
    #[serde(default)]
    pub location_id: Option<String>,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagersResponse {
    pub location_id: String,
    pub managers: Vec<Manager>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddManagerResponse {
    /// None when the name was blank
    pub manager: Option<Manager>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedNamesResponse {
    pub location_id: String,
    pub names: Vec<SavedName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddSavedNameResponse {
    pub saved_name: Option<SavedName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveSavedNameResponse {
    pub id: String,
    pub removed: bool,
}
