// Entry Domain Model - one guest visit record

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::error::DomainError;

/// Entry ID (UUID v4). Stable while the entry occupies one stage.
pub type EntryId = String;

/// How the guest arrived, recorded when service begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinType {
    WalkIn,
    Appointment,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::WalkIn => write!(f, "walk-in"),
            JoinType::Appointment => write!(f, "appointment"),
        }
    }
}

impl FromStr for JoinType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walk-in" | "walkin" | "walk_in" => Ok(JoinType::WalkIn),
            "appointment" | "appt" => Ok(JoinType::Appointment),
            other => Err(DomainError::UnknownJoinType(other.to_string())),
        }
    }
}

/// Justification recorded when a completed visit goes back to its original slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarlyReason {
    Service,
    Parts,
    Finance,
    Other,
}

impl std::fmt::Display for EarlyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EarlyReason::Service => write!(f, "service"),
            EarlyReason::Parts => write!(f, "parts"),
            EarlyReason::Finance => write!(f, "finance"),
            EarlyReason::Other => write!(f, "other"),
        }
    }
}

impl FromStr for EarlyReason {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(EarlyReason::Service),
            "parts" => Ok(EarlyReason::Parts),
            "finance" => Ok(EarlyReason::Finance),
            "other" => Ok(EarlyReason::Other),
            other => Err(DomainError::UnknownEarlyReason(other.to_string())),
        }
    }
}

/// Maximum number of helper/manager names attributed to one visit
pub const MAX_MANAGERS: usize = 3;

/// Guest visit record as stored in the feed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub note: String,

    // Timestamps are epoch ms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_reason: Option<EarlyReason>,

    /// Waiting-list index captured when the entry left the waiting list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_queue_index: Option<usize>,
}

impl Entry {
    /// Create a waiting entry
    ///
    /// # Arguments
    ///
    /// * `id` - Unique entry ID (injected, not generated)
    /// * `joined_at` - Join timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        joined_at: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            note: note.into(),
            joined_at: Some(joined_at),
            service_start: None,
            completed_at: None,
            join_type: None,
            managers: None,
            team_label: None,
            early_reason: None,
            original_queue_index: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Uppercase initials of the guest ("Ana Lee" -> "AL")
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .next()
            .into_iter()
            .chain(self.last_name.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }

    /// Mark the entry as in service, remembering where it stood in line
    pub fn start_service(&mut self, now_millis: i64, join_type: JoinType, queue_index: usize) {
        self.service_start = Some(now_millis);
        self.join_type = Some(join_type);
        self.original_queue_index = Some(queue_index);
    }

    /// Drop every in-service field; the entry is waiting again
    pub fn clear_service(&mut self) {
        self.service_start = None;
        self.join_type = None;
        self.original_queue_index = None;
    }

    /// Fresh waiting instance of the same guest, used when a visit completes.
    /// The note and all service/attribution fields start empty.
    pub fn requeued(&self, id: impl Into<String>, now_millis: i64) -> Self {
        Self::new(
            id,
            now_millis,
            self.first_name.clone(),
            self.last_name.clone(),
            String::new(),
        )
    }
}
