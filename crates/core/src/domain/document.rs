// Document addressing for the shared document store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path of one document in the shared store, e.g. `stores/store-1/regions/North`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Feed document of one (location, region) pair
    pub fn feed(location_id: &str, region: &str) -> Self {
        Self(format!("stores/{}/regions/{}", location_id, region))
    }

    /// Helper/manager roster of a location
    pub fn managers(location_id: &str) -> Self {
        Self(format!("stores/{}/meta/managers", location_id))
    }

    /// Saved guest names roster of a location
    pub fn saved_names(location_id: &str) -> Self {
        Self(format!("stores/{}/meta/savedNames", location_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(
            DocumentKey::feed("store-1", "North").as_str(),
            "stores/store-1/regions/North"
        );
        assert_eq!(
            DocumentKey::managers("store-1").as_str(),
            "stores/store-1/meta/managers"
        );
        assert_eq!(
            DocumentKey::saved_names("store-1").to_string(),
            "stores/store-1/meta/savedNames"
        );
    }
}
