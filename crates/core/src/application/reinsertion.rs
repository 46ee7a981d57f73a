//! Positional Reinsertion - where an entry lands when it rejoins the line
//!
//! An entry leaving service may go back to the slot it held before service
//! began, but only for a short window after service started. Past the
//! window the only valid landing spot is the bottom of the line; a request
//! for the original slot is downgraded rather than refused.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::{DomainError, Entry};

/// How long after service start the original slot stays available (2 minutes)
pub const ORIGINAL_SLOT_WINDOW_MS: i64 = 120_000;

/// Requested (or resolved) landing spot in the waiting list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// The index held before service began
    Original,
    /// Tail of the line
    #[default]
    Bottom,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Original => write!(f, "original"),
            Position::Bottom => write!(f, "bottom"),
        }
    }
}

impl FromStr for Position {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" | "original-slot" | "original_slot" => Ok(Position::Original),
            "bottom" => Ok(Position::Bottom),
            other => Err(DomainError::UnknownPosition(other.to_string())),
        }
    }
}

/// Where an entry actually landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Position,
    pub index: usize,
}

/// True while `now` is inside the window that opened at `service_start`
pub fn original_slot_eligible(service_start: Option<i64>, now_millis: i64) -> bool {
    match service_start {
        Some(start) => now_millis.saturating_sub(start) < ORIGINAL_SLOT_WINDOW_MS,
        None => false,
    }
}

/// Downgrade a request for the original slot when it is no longer allowed
/// (window elapsed, or no slot was ever recorded).
pub fn resolve_position(requested: Position, entry: &Entry, now_millis: i64) -> Position {
    match requested {
        Position::Original
            if entry.original_queue_index.is_some()
                && original_slot_eligible(entry.service_start, now_millis) =>
        {
            Position::Original
        }
        _ => Position::Bottom,
    }
}

/// Landing index for a resolved position in a line of `queue_len` entries.
/// The saved index is clamped because the line may have shrunk since.
pub fn landing_index(position: Position, original_index: Option<usize>, queue_len: usize) -> usize {
    match (position, original_index) {
        (Position::Original, Some(index)) => index.min(queue_len),
        _ => queue_len,
    }
}

/// Resolve the request against `entry` and compute the landing index
pub fn place(requested: Position, entry: &Entry, queue_len: usize, now_millis: i64) -> Placement {
    let position = resolve_position(requested, entry, now_millis);
    Placement {
        position,
        index: landing_index(position, entry.original_queue_index, queue_len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JoinType;

    fn serving(start: i64, original_index: usize) -> Entry {
        let mut entry = Entry::new("e1", 0, "Ana", "Lee", "");
        entry.start_service(start, JoinType::WalkIn, original_index);
        entry
    }

    #[test]
    fn test_window_is_strict() {
        assert!(original_slot_eligible(Some(1_000), 1_000));
        assert!(original_slot_eligible(Some(1_000), 1_000 + ORIGINAL_SLOT_WINDOW_MS - 1));
        assert!(!original_slot_eligible(Some(1_000), 1_000 + ORIGINAL_SLOT_WINDOW_MS));
        assert!(!original_slot_eligible(None, 1_000));
    }

    #[test]
    fn test_original_inside_window() {
        let entry = serving(10_000, 2);
        let placement = place(Position::Original, &entry, 5, 60_000);
        assert_eq!(
            placement,
            Placement {
                position: Position::Original,
                index: 2
            }
        );
    }

    #[test]
    fn test_original_downgraded_after_window() {
        let entry = serving(10_000, 2);
        let placement = place(Position::Original, &entry, 5, 10_000 + 200_000);
        assert_eq!(placement.position, Position::Bottom);
        assert_eq!(placement.index, 5);
    }

    #[test]
    fn test_original_index_clamped_to_shorter_line() {
        let entry = serving(10_000, 7);
        assert_eq!(place(Position::Original, &entry, 3, 20_000).index, 3);
        assert_eq!(place(Position::Original, &entry, 0, 20_000).index, 0);
    }

    #[test]
    fn test_missing_slot_falls_back_to_bottom() {
        let mut entry = serving(10_000, 1);
        entry.original_queue_index = None;
        assert_eq!(resolve_position(Position::Original, &entry, 20_000), Position::Bottom);
    }

    #[test]
    fn test_extreme_service_start_does_not_overflow() {
        let ancient = serving(i64::MIN, 0);
        assert_eq!(place(Position::Original, &ancient, 0, 1_000).position, Position::Bottom);

        let future = serving(i64::MAX, 0);
        assert_eq!(place(Position::Original, &future, 2, i64::MIN).index, 0);
        assert!(!original_slot_eligible(Some(i64::MIN), i64::MAX));
    }

    #[test]
    fn test_bottom_always_tail() {
        let entry = serving(10_000, 0);
        assert_eq!(place(Position::Bottom, &entry, 4, 11_000).index, 4);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("Original".parse::<Position>().unwrap(), Position::Original);
        assert_eq!("bottom".parse::<Position>().unwrap(), Position::Bottom);
        assert!("top".parse::<Position>().is_err());
    }
}
