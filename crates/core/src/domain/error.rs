// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown join type: {0}")]
    UnknownJoinType(String),

    #[error("Unknown early reason: {0}")]
    UnknownEarlyReason(String),

    #[error("Unknown queue position: {0}")]
    UnknownPosition(String),

    /// An entry id was observed in more than one live list
    #[error("Entry {id} present in both {first} and {second}")]
    SplitEntry {
        id: String,
        first: &'static str,
        second: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, DomainError>;
