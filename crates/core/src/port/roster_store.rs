// Roster Port - shared helper and saved-name lists of a location

use crate::domain::{Manager, SavedName};
use crate::error::Result;
use async_trait::async_trait;

/// Roster collaborator used by the lifecycle engine.
///
/// Upserts are atomic: two clients adding the same name (case-insensitive)
/// at once end up with one row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RosterStore: Send + Sync {
    /// Create both roster documents if they are missing
    async fn init_if_missing(&self, location_id: &str) -> Result<()>;

    async fn managers(&self, location_id: &str) -> Result<Vec<Manager>>;

    /// Upsert a helper by name. `None` if the name is empty after trimming.
    async fn add_manager(&self, location_id: &str, name: &str) -> Result<Option<Manager>>;

    async fn saved_names(&self, location_id: &str) -> Result<Vec<SavedName>>;

    /// Upsert a guest name. `None` if the first name is empty after trimming.
    async fn add_saved_name(
        &self,
        location_id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<SavedName>>;

    /// Remove a saved name; returns whether it was present
    async fn remove_saved_name(&self, location_id: &str, id: &str) -> Result<bool>;
}
