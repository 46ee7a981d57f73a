// Feed Document - the shared queue/active/completed state of one region

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::document::DocumentKey;
use crate::domain::entry::Entry;
use crate::domain::error::{DomainError, Result};
use crate::domain::normalize::{assign_missing_ids, entries_from_value};

/// Identifies one feed: a region of a location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedKey {
    pub location_id: String,
    pub region: String,
}

impl FeedKey {
    pub fn new(location_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            region: region.into(),
        }
    }

    pub fn document_key(&self) -> DocumentKey {
        DocumentKey::feed(&self.location_id, &self.region)
    }

    /// Same location, different region
    pub fn with_region(&self, region: impl Into<String>) -> Self {
        Self::new(self.location_id.clone(), region)
    }
}

impl std::fmt::Display for FeedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.location_id, self.region)
    }
}

/// The three lists of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedList {
    Queue,
    Active,
    Completed,
}

impl FeedList {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedList::Queue => "queue",
            FeedList::Active => "active",
            FeedList::Completed => "completed",
        }
    }
}

/// `{ queue, active, completed }` - order of `queue` is line order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDocument {
    #[serde(default)]
    pub queue: Vec<Entry>,
    #[serde(default)]
    pub active: Vec<Entry>,
    #[serde(default)]
    pub completed: Vec<Entry>,
}

impl FeedDocument {
    /// Default document written when a feed is first opened
    pub fn empty_document() -> Value {
        serde_json::json!({ "queue": [], "active": [], "completed": [] })
    }

    /// Read a stored document, normalizing records from older clients.
    /// A missing document reads as an empty feed.
    pub fn from_document(doc: Option<&Value>, fresh_id: &mut dyn FnMut() -> String) -> Self {
        let field = |name: &str| doc.and_then(|d| d.get(name));
        Self {
            queue: entries_from_value(field("queue"), fresh_id),
            active: entries_from_value(field("active"), fresh_id),
            completed: entries_from_value(field("completed"), fresh_id),
        }
    }

    /// Give stored entries that have no id a permanent one, in place.
    /// Returns whether the document changed and needs writing back.
    pub fn assign_missing_ids(doc: &mut Value, fresh_id: &mut dyn FnMut() -> String) -> bool {
        assign_missing_ids(doc, &["queue", "active", "completed"], fresh_id)
    }

    /// Whole-document form: all three lists, always written together
    pub fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    pub fn list(&self, list: FeedList) -> &Vec<Entry> {
        match list {
            FeedList::Queue => &self.queue,
            FeedList::Active => &self.active,
            FeedList::Completed => &self.completed,
        }
    }

    pub fn list_mut(&mut self, list: FeedList) -> &mut Vec<Entry> {
        match list {
            FeedList::Queue => &mut self.queue,
            FeedList::Active => &mut self.active,
            FeedList::Completed => &mut self.completed,
        }
    }

    pub fn position(&self, list: FeedList, id: &str) -> Option<usize> {
        self.list(list).iter().position(|e| e.id == id)
    }

    /// Remove an entry by id, returning it with the index it occupied
    pub fn take(&mut self, list: FeedList, id: &str) -> Option<(usize, Entry)> {
        let index = self.position(list, id)?;
        Some((index, self.list_mut(list).remove(index)))
    }

    /// Which live list (queue or active) currently holds the id
    pub fn stage_of(&self, id: &str) -> Option<FeedList> {
        [FeedList::Queue, FeedList::Active]
            .into_iter()
            .find(|list| self.position(*list, id).is_some())
    }

    /// Every live id must sit in exactly one of queue/active
    pub fn check_exclusive(&self) -> Result<()> {
        let mut seen: HashMap<&str, &'static str> = HashMap::new();
        for (name, entries) in [("queue", &self.queue), ("active", &self.active)] {
            for entry in entries {
                if let Some(first) = seen.insert(entry.id.as_str(), name) {
                    return Err(DomainError::SplitEntry {
                        id: entry.id.clone(),
                        first,
                        second: name,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_ids() -> impl FnMut() -> String {
        || "generated".to_string()
    }

    #[test]
    fn test_missing_document_reads_empty() {
        let feed = FeedDocument::from_document(None, &mut no_ids());
        assert_eq!(feed, FeedDocument::default());
    }

    #[test]
    fn test_partial_document_reads_defaults() {
        let doc = json!({ "queue": [{"id": "a", "firstName": "Ana"}] });
        let feed = FeedDocument::from_document(Some(&doc), &mut no_ids());

        assert_eq!(feed.queue.len(), 1);
        assert!(feed.active.is_empty());
        assert!(feed.completed.is_empty());
    }

    #[test]
    fn test_document_round_trip_keeps_order() {
        let mut feed = FeedDocument::default();
        for (i, name) in ["Ana", "Bo", "Cy"].iter().enumerate() {
            feed.queue.push(Entry::new(format!("e{}", i), 1000, *name, "", ""));
        }

        let doc = feed.to_document().unwrap();
        let back = FeedDocument::from_document(Some(&doc), &mut no_ids());

        assert_eq!(back, feed);
        assert_eq!(doc["active"], json!([]));
    }

    #[test]
    fn test_take_returns_index() {
        let mut feed = FeedDocument::default();
        feed.queue.push(Entry::new("a", 0, "A", "", ""));
        feed.queue.push(Entry::new("b", 0, "B", "", ""));

        let (index, entry) = feed.take(FeedList::Queue, "b").unwrap();
        assert_eq!(index, 1);
        assert_eq!(entry.id, "b");
        assert!(feed.take(FeedList::Queue, "b").is_none());
    }

    #[test]
    fn test_check_exclusive_detects_split() {
        let mut feed = FeedDocument::default();
        feed.queue.push(Entry::new("a", 0, "A", "", ""));
        assert!(feed.check_exclusive().is_ok());
        assert_eq!(feed.stage_of("a"), Some(FeedList::Queue));

        feed.active.push(Entry::new("a", 0, "A", "", ""));
        assert_eq!(
            feed.check_exclusive(),
            Err(DomainError::SplitEntry {
                id: "a".to_string(),
                first: "queue",
                second: "active",
            })
        );
    }
}
