// Roster Domain Model - reusable names shared by a location

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::normalize::{managers_from_value, saved_names_from_value};

/// Helper/manager who can be attributed to a visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Remembered guest name for quick re-adding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedName {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl SavedName {
    /// Case-insensitive match on both name parts
    pub fn matches(&self, first_name: &str, last_name: &str) -> bool {
        self.first_name.to_lowercase() == first_name.to_lowercase()
            && self.last_name.to_lowercase() == last_name.to_lowercase()
    }
}

/// `{ managers: [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagersDoc {
    #[serde(default)]
    pub managers: Vec<Manager>,
}

impl ManagersDoc {
    pub const LIST: &'static str = "managers";

    /// Lenient read; a missing document or list reads as empty
    pub fn from_document(doc: Option<&Value>, fresh_id: &mut dyn FnMut() -> String) -> Self {
        Self {
            managers: managers_from_value(doc.and_then(|d| d.get(Self::LIST)), fresh_id),
        }
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Manager> {
        let wanted = name.to_lowercase();
        self.managers.iter().find(|m| m.name.to_lowercase() == wanted)
    }
}

/// `{ names: [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedNamesDoc {
    #[serde(default)]
    pub names: Vec<SavedName>,
}

impl SavedNamesDoc {
    pub const LIST: &'static str = "names";

    pub fn from_document(doc: Option<&Value>, fresh_id: &mut dyn FnMut() -> String) -> Self {
        Self {
            names: saved_names_from_value(doc.and_then(|d| d.get(Self::LIST)), fresh_id),
        }
    }
}

/// Trim and collapse internal whitespace runs ("  Sam   Ho " -> "Sam Ho")
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
