// Manager Attribution Resolver
//
// Turns a helper selection (roster ids + optional typed name) into the list
// of at most MAX_MANAGERS names stored on a visit.

use crate::domain::entry::MAX_MANAGERS;
use crate::domain::normalize_name;
use crate::error::Result;
use crate::port::RosterStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Helpers picked for a visit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerSelection {
    /// Existing roster ids; only the first MAX_MANAGERS are considered
    #[serde(default)]
    pub selected_ids: Vec<String>,
    /// Free-typed helper name, upserted into the roster
    #[serde(default)]
    pub typed_name: Option<String>,
}

impl ManagerSelection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selected_ids: ids.into_iter().map(Into::into).collect(),
            typed_name: None,
        }
    }

    pub fn typed(name: impl Into<String>) -> Self {
        Self {
            selected_ids: Vec::new(),
            typed_name: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected_ids.is_empty()
            && self
                .typed_name
                .as_deref()
                .map_or(true, |n| n.trim().is_empty())
    }
}

fn contains_name(names: &[String], name: &str) -> bool {
    let wanted = name.to_lowercase();
    names.iter().any(|n| n.to_lowercase() == wanted)
}

/// Union of `selected` and `typed`, capped at MAX_MANAGERS. When the cap
/// bites, the typed name keeps its place and the selection is cut instead.
pub fn combine_names(selected: Vec<String>, typed: Option<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(MAX_MANAGERS);
    for name in selected {
        if !contains_name(&names, &name) {
            names.push(name);
        }
    }
    if let Some(typed) = typed {
        if !contains_name(&names, &typed) {
            names.truncate(MAX_MANAGERS - 1);
            names.push(typed);
        }
    }
    names.truncate(MAX_MANAGERS);
    names
}

/// Attach newly resolved helpers to names already on an entry. Newly
/// resolved names come first; the result never exceeds MAX_MANAGERS.
pub fn merge_managers(existing: Option<&[String]>, resolved: &[String]) -> Option<Vec<String>> {
    let mut merged: Vec<String> = Vec::with_capacity(MAX_MANAGERS);
    for name in resolved.iter().chain(existing.unwrap_or_default()) {
        if merged.len() == MAX_MANAGERS {
            break;
        }
        if !contains_name(&merged, name) {
            merged.push(name.clone());
        }
    }
    if merged.is_empty() {
        None
    } else {
        Some(merged)
    }
}

pub struct AttributionResolver {
    roster: Arc<dyn RosterStore>,
}

impl AttributionResolver {
    pub fn new(roster: Arc<dyn RosterStore>) -> Self {
        Self { roster }
    }

    /// Resolve a selection to helper names, upserting the typed name
    pub async fn resolve(&self, location_id: &str, selection: &ManagerSelection) -> Result<Vec<String>> {
        if selection.is_empty() {
            return Ok(Vec::new());
        }

        let wanted: Vec<&String> = selection.selected_ids.iter().take(MAX_MANAGERS).collect();
        let selected: Vec<String> = if wanted.is_empty() {
            Vec::new()
        } else {
            self.roster
                .managers(location_id)
                .await?
                .into_iter()
                .filter(|m| wanted.contains(&&m.id))
                .map(|m| m.name)
                .collect()
        };

        let typed = match selection.typed_name.as_deref().map(normalize_name) {
            Some(name) if !name.is_empty() => self
                .roster
                .add_manager(location_id, &name)
                .await?
                .map(|m| m.name),
            _ => None,
        };

        let names = combine_names(selected, typed);
        debug!(location_id = %location_id, managers = ?names, "Resolved visit attribution");
        Ok(names)
    }
}
