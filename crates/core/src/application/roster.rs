// Roster Service - RosterStore backed by the shared document store
//
// Every mutation is a `transact` read-modify-write on the roster document,
// so concurrent upserts of the same name collapse to one row.

use crate::domain::normalize::{assign_missing_ids, has_missing_ids};
use crate::domain::{
    normalize_name, DocumentKey, Manager, ManagersDoc, SavedName, SavedNamesDoc,
};
use crate::error::Result;
use crate::port::{Document, DocumentStore, IdProvider, RosterStore};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

pub struct DocumentRoster {
    store: Arc<dyn DocumentStore>,
    id_provider: Arc<dyn IdProvider>,
}

impl DocumentRoster {
    pub fn new(store: Arc<dyn DocumentStore>, id_provider: Arc<dyn IdProvider>) -> Self {
        Self { store, id_provider }
    }

    /// Read a roster document. Rows written without an id get one
    /// persisted here, so ids handed out stay valid for later removals.
    async fn load(&self, key: &DocumentKey, list: &str) -> Result<Option<Document>> {
        match self.store.get_once(key).await? {
            Some(doc) if has_missing_ids(&doc, &[list]) => {
                let stored = self
                    .store
                    .transact(key, &mut |current| Ok(self.with_ids(current, list)))
                    .await?;
                info!(document = %key, "Roster rows without ids repaired");
                Ok(stored)
            }
            other => Ok(other),
        }
    }

    /// `doc` with missing ids filled in, or `None` when nothing was missing
    fn with_ids(&self, doc: Option<Document>, list: &str) -> Option<Document> {
        let mut doc = doc?;
        assign_missing_ids(&mut doc, &[list], &mut || self.id_provider.generate_id())
            .then_some(doc)
    }

    fn fresh_id(&self) -> impl FnMut() -> String + '_ {
        || self.id_provider.generate_id()
    }
}

#[async_trait]
impl RosterStore for DocumentRoster {
    async fn init_if_missing(&self, location_id: &str) -> Result<()> {
        self.store
            .create_if_missing(&DocumentKey::managers(location_id), json!({ "managers": [] }))
            .await?;
        self.store
            .create_if_missing(&DocumentKey::saved_names(location_id), json!({ "names": [] }))
            .await
    }

    async fn managers(&self, location_id: &str) -> Result<Vec<Manager>> {
        let doc = self.load(&DocumentKey::managers(location_id), ManagersDoc::LIST).await?;
        Ok(ManagersDoc::from_document(doc.as_ref(), &mut self.fresh_id()).managers)
    }

    async fn add_manager(&self, location_id: &str, name: &str) -> Result<Option<Manager>> {
        let name = normalize_name(name);
        if name.is_empty() {
            return Ok(None);
        }

        let key = DocumentKey::managers(location_id);
        let mut resolved: Option<Manager> = None;
        let mut created = false;
        self.store
            .transact(&key, &mut |current| {
                let mut doc = ManagersDoc::from_document(current.as_ref(), &mut self.fresh_id());
                if let Some(existing) = doc.find_by_name(&name) {
                    resolved = Some(existing.clone());
                    created = false;
                    return Ok(None);
                }
                let manager = Manager {
                    id: self.id_provider.generate_id(),
                    name: name.clone(),
                };
                doc.managers.push(manager.clone());
                resolved = Some(manager);
                created = true;
                Ok(Some(serde_json::to_value(&doc)?))
            })
            .await?;

        if created {
            info!(location_id = %location_id, name = %name, "Manager added to roster");
        } else {
            debug!(location_id = %location_id, name = %name, "Manager already on roster");
        }
        Ok(resolved)
    }

    async fn saved_names(&self, location_id: &str) -> Result<Vec<SavedName>> {
        let doc = self.load(&DocumentKey::saved_names(location_id), SavedNamesDoc::LIST).await?;
        Ok(SavedNamesDoc::from_document(doc.as_ref(), &mut self.fresh_id()).names)
    }

    async fn add_saved_name(
        &self,
        location_id: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<SavedName>> {
        let first_name = normalize_name(first_name);
        let last_name = normalize_name(last_name);
        if first_name.is_empty() {
            return Ok(None);
        }

        let key = DocumentKey::saved_names(location_id);
        let mut resolved: Option<SavedName> = None;
        self.store
            .transact(&key, &mut |current| {
                let mut doc = SavedNamesDoc::from_document(current.as_ref(), &mut self.fresh_id());
                if let Some(existing) = doc.names.iter().find(|n| n.matches(&first_name, &last_name)) {
                    resolved = Some(existing.clone());
                    return Ok(None);
                }
                let saved = SavedName {
                    id: self.id_provider.generate_id(),
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                };
                doc.names.push(saved.clone());
                resolved = Some(saved);
                Ok(Some(serde_json::to_value(&doc)?))
            })
            .await?;

        debug!(location_id = %location_id, first_name = %first_name, "Saved name recorded");
        Ok(resolved)
    }

    async fn remove_saved_name(&self, location_id: &str, id: &str) -> Result<bool> {
        let key = DocumentKey::saved_names(location_id);
        let mut removed = false;
        self.store
            .transact(&key, &mut |current| {
                if current.is_none() {
                    removed = false;
                    return Ok(None);
                }
                let mut doc = SavedNamesDoc::from_document(current.as_ref(), &mut self.fresh_id());
                let before = doc.names.len();
                doc.names.retain(|n| n.id != id);
                removed = doc.names.len() != before;
                if !removed {
                    return Ok(None);
                }
                Ok(Some(serde_json::to_value(&doc)?))
            })
            .await?;

        if removed {
            info!(location_id = %location_id, saved_name_id = %id, "Saved name removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::document_store::mocks::InMemoryDocumentStore;
    use crate::port::id_provider::mocks::SequentialIds;

    fn roster() -> (Arc<InMemoryDocumentStore>, DocumentRoster) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let roster = DocumentRoster::new(store.clone(), Arc::new(SequentialIds::new("r")));
        (store, roster)
    }

    #[tokio::test]
    async fn test_add_manager_reuses_case_insensitive_match() {
        let (_, roster) = roster();
        roster.init_if_missing("store-1").await.unwrap();

        let first = roster.add_manager("store-1", "Sam  Ho").await.unwrap().unwrap();
        let again = roster.add_manager("store-1", "  sam ho ").await.unwrap().unwrap();

        assert_eq!(first.name, "Sam Ho");
        assert_eq!(first.id, again.id);
        assert_eq!(roster.managers("store-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_manager_empty_name_is_noop() {
        let (store, roster) = roster();
        assert!(roster.add_manager("store-1", "   ").await.unwrap().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_add_manager_without_init_creates_document() {
        let (_, roster) = roster();
        roster.add_manager("store-1", "Kim").await.unwrap();
        assert_eq!(roster.managers("store-1").await.unwrap()[0].name, "Kim");
    }

    #[tokio::test]
    async fn test_concurrent_identical_upserts_create_one_row() {
        let (_, roster) = roster();
        let roster = Arc::new(roster);

        let adds = (0..8).map(|i| {
            let roster = roster.clone();
            let name = if i % 2 == 0 { "Pat Kay" } else { "PAT KAY" };
            async move { roster.add_manager("store-1", name).await.unwrap().unwrap() }
        });
        let results = futures::future::join_all(adds).await;

        assert!(results.iter().all(|m| m.id == results[0].id));
        assert_eq!(roster.managers("store-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_saved_names_match_both_parts() {
        let (_, roster) = roster();
        let ana = roster.add_saved_name("store-1", "Ana", "Lee").await.unwrap().unwrap();
        let ana_again = roster.add_saved_name("store-1", "ana", "LEE").await.unwrap().unwrap();
        let ana_other = roster.add_saved_name("store-1", "Ana", "Park").await.unwrap().unwrap();

        assert_eq!(ana.id, ana_again.id);
        assert_ne!(ana.id, ana_other.id);
        assert!(roster.add_saved_name("store-1", " ", "Lee").await.unwrap().is_none());
        assert_eq!(roster.saved_names("store-1").await.unwrap().len(), 2);
    }

    #[test]
    fn test_remove_saved_name() {
        let (_, roster) = roster();
        let ana = tokio_test::block_on(roster.add_saved_name("store-1", "Ana", "Lee"))
            .unwrap()
            .unwrap();

        assert!(tokio_test::block_on(roster.remove_saved_name("store-1", &ana.id)).unwrap());
        assert!(!tokio_test::block_on(roster.remove_saved_name("store-1", &ana.id)).unwrap());
        assert!(!tokio_test::block_on(roster.remove_saved_name("store-2", "x")).unwrap());
        assert!(tokio_test::block_on(roster.saved_names("store-1")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_manager_rows_are_readable_and_extendable() {
        let (store, roster) = roster();
        let key = DocumentKey::managers("store-1");
        store
            .create_if_missing(&key, json!({"managers": [{"name": "Legacy"}, "junk"]}))
            .await
            .unwrap();

        let listed = roster.managers("store-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Legacy");
        // The repaired id is stored, so a second read sees the same one
        assert_eq!(roster.managers("store-1").await.unwrap()[0].id, listed[0].id);

        let kim = roster.add_manager("store-1", "Kim").await.unwrap().unwrap();
        let again = roster.add_manager("store-1", "legacy").await.unwrap().unwrap();
        assert_eq!(kim.name, "Kim");
        assert_eq!(again.id, listed[0].id);
        assert_eq!(roster.managers("store-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_null_roster_list_reads_empty() {
        let (store, roster) = roster();
        store
            .create_if_missing(&DocumentKey::managers("store-1"), json!({"managers": null}))
            .await
            .unwrap();
        let writes = store.write_count();

        assert!(roster.managers("store-1").await.unwrap().is_empty());
        assert_eq!(store.write_count(), writes);
        roster.add_manager("store-1", "Kim").await.unwrap();
        assert_eq!(roster.managers("store-1").await.unwrap()[0].name, "Kim");
    }

    #[tokio::test]
    async fn test_saved_name_without_id_can_be_removed() {
        let (store, roster) = roster();
        store
            .create_if_missing(
                &DocumentKey::saved_names("store-1"),
                json!({"names": [{"firstName": "Ana", "lastName": "Lee"}]}),
            )
            .await
            .unwrap();

        let listed = roster.saved_names("store-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(roster.remove_saved_name("store-1", &listed[0].id).await.unwrap());
        assert!(roster.saved_names("store-1").await.unwrap().is_empty());
    }
}
