// Domain Layer - Pure business logic and entities

pub mod document;
pub mod entry;
pub mod error;
pub mod feed;
pub(crate) mod normalize;
pub mod roster;

// Re-exports
pub use document::DocumentKey;
pub use entry::{EarlyReason, Entry, EntryId, JoinType};
pub use error::DomainError;
pub use feed::{FeedDocument, FeedKey, FeedList};
pub use roster::{normalize_name, Manager, ManagersDoc, SavedName, SavedNamesDoc};
