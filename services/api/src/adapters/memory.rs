//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `DocumentStore` port. Selected with a
//! `memory:` database URL for local runs, and used by the test suite.

use async_trait::async_trait;
use futures::stream;
use std::collections::HashMap;
use taskboard_core::domain::{
    Collection, DeleteOutcome, Document, DocumentId, InsertOutcome, UpdateOutcome, ID_FIELD,
};
use taskboard_core::ports::{
    DocumentStore, DocumentStream, Filter, PortError, PortResult, Sort, Update,
};
use tokio::sync::RwLock;

/// A document store held in memory. Each collection keeps insertion order,
/// which is also the tie-break when sorting.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
    unique: Vec<(Collection, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store with the same uniqueness constraints as the Postgres schema.
    pub fn with_default_constraints() -> Self {
        Self::new().with_unique(Collection::Users, "email")
    }

    /// Declares that no two documents of `collection` may share a value of `field`.
    pub fn with_unique(mut self, collection: Collection, field: impl Into<String>) -> Self {
        self.unique.push((collection, field.into()));
        self
    }

    fn check_unique(
        &self,
        collection: Collection,
        documents: &[Document],
        candidate: &Document,
        skip: Option<usize>,
    ) -> PortResult<()> {
        for (_, field) in self.unique.iter().filter(|(c, _)| *c == collection) {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            let clash = documents
                .iter()
                .enumerate()
                .any(|(index, other)| Some(index) != skip && other.get(field) == Some(value));
            if clash {
                return Err(PortError::Conflict(format!(
                    "duplicate value for `{}` in {}",
                    field, collection
                )));
            }
        }
        Ok(())
    }

    fn insert_into(
        &self,
        collection: Collection,
        documents: &mut Vec<Document>,
        mut document: Document,
    ) -> PortResult<DocumentId> {
        let id = DocumentId::generate();
        document.insert(ID_FIELD.into(), id.into());
        self.check_unique(collection, documents, &document, None)?;
        documents.push(document);
        Ok(id)
    }

    /// Applies `update` to one document, committing only if the result still
    /// satisfies the uniqueness constraints.
    fn apply_at(
        &self,
        collection: Collection,
        documents: &mut [Document],
        index: usize,
        update: &Update,
    ) -> PortResult<bool> {
        let mut candidate = documents[index].clone();
        let changed = update.apply(&mut candidate);
        if changed {
            self.check_unique(collection, documents, &candidate, Some(index))?;
            documents[index] = candidate;
        }
        Ok(changed)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> PortResult<InsertOutcome> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();
        let id = self.insert_into(collection, documents, document)?;
        Ok(InsertOutcome::new(id))
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> PortResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|documents| documents.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<Sort>,
    ) -> PortResult<DocumentStream> {
        let mut matching: Vec<Document> = {
            let collections = self.collections.read().await;
            collections
                .get(&collection)
                .map(|documents| {
                    documents
                        .iter()
                        .filter(|doc| filter.matches(doc))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        if let Some(sort) = sort {
            // Stable, so ties keep insertion order.
            matching.sort_by(|left, right| sort.compare(left, right));
        }
        Ok(Box::pin(stream::iter(matching.into_iter().map(Ok))))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> PortResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();

        match documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                let changed = self.apply_at(collection, documents, index, update)?;
                Ok(UpdateOutcome::new(1, changed as u64))
            }
            None if upsert => {
                let id = self.insert_into(collection, documents, update.seed(filter))?;
                Ok(UpdateOutcome::upserted(id))
            }
            None => Ok(UpdateOutcome::new(0, 0)),
        }
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> PortResult<UpdateOutcome> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(UpdateOutcome::new(0, 0));
        };

        let targets: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(index, _)| index)
            .collect();

        let mut modified = 0;
        for &index in &targets {
            if self.apply_at(collection, documents, index, update)? {
                modified += 1;
            }
        }
        Ok(UpdateOutcome::new(targets.len() as u64, modified))
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> PortResult<Option<Document>> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        let Some(index) = documents.iter().position(|doc| filter.matches(doc)) else {
            return Ok(None);
        };
        self.apply_at(collection, documents, index, update)?;
        Ok(Some(documents[index].clone()))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> PortResult<DeleteOutcome> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(&collection)
            .and_then(|documents| {
                let index = documents.iter().position(|doc| filter.matches(doc))?;
                Some(documents.remove(index))
            })
            .is_some();
        Ok(DeleteOutcome::new(removed as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    async fn all(store: &MemoryStore, collection: Collection, sort: Option<Sort>) -> Vec<Document> {
        store
            .find(collection, &Filter::all(), sort)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_an_id_that_find_one_can_use() {
        let store = MemoryStore::new();
        let outcome = store
            .insert_one(Collection::Tasks, document(json!({"title": "A"})))
            .await
            .unwrap();

        let found = store
            .find_one(Collection::Tasks, &Filter::by_id(outcome.inserted_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found["title"], "A");
        assert_eq!(found[ID_FIELD], outcome.inserted_id.to_string());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = MemoryStore::new();
        store
            .insert_one(Collection::Tasks, document(json!({"title": "A"})))
            .await
            .unwrap();
        assert!(all(&store, Collection::Tutorials, None).await.is_empty());
    }

    #[tokio::test]
    async fn unique_fields_reject_duplicates_on_insert_and_update() {
        let store = MemoryStore::with_default_constraints();
        store
            .insert_one(Collection::Users, document(json!({"email": "a@x.io"})))
            .await
            .unwrap();
        let second = store
            .insert_one(Collection::Users, document(json!({"email": "b@x.io"})))
            .await
            .unwrap();

        let duplicate = store
            .insert_one(Collection::Users, document(json!({"email": "a@x.io"})))
            .await;
        assert!(matches!(duplicate, Err(PortError::Conflict(_))));

        let renamed = store
            .update_one(
                Collection::Users,
                &Filter::by_id(second.inserted_id),
                &Update::set("email", "a@x.io"),
                false,
            )
            .await;
        assert!(matches!(renamed, Err(PortError::Conflict(_))));
        assert_eq!(all(&store, Collection::Users, None).await.len(), 2);
    }

    #[tokio::test]
    async fn update_one_reports_matched_and_modified() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Tasks, document(json!({"category": "To-Do"})))
            .await
            .unwrap()
            .inserted_id;
        let filter = Filter::by_id(id);

        let unchanged = store
            .update_one(Collection::Tasks, &filter, &Update::set("category", "To-Do"), false)
            .await
            .unwrap();
        assert_eq!((unchanged.matched_count, unchanged.modified_count), (1, 0));

        let changed = store
            .update_one(Collection::Tasks, &filter, &Update::set("category", "Done"), false)
            .await
            .unwrap();
        assert_eq!((changed.matched_count, changed.modified_count), (1, 1));

        let missing = store
            .update_one(
                Collection::Tasks,
                &Filter::by_id(DocumentId::generate()),
                &Update::set("category", "Done"),
                false,
            )
            .await
            .unwrap();
        assert_eq!(missing, UpdateOutcome::new(0, 0));
    }

    #[tokio::test]
    async fn upsert_inserts_seed_when_nothing_matches() {
        let store = MemoryStore::new();
        let outcome = store
            .update_one(
                Collection::Users,
                &Filter::all().eq("email", "a@x.io"),
                &Update::set("name", "Ada"),
                true,
            )
            .await
            .unwrap();
        let id = outcome.upserted_id.unwrap();

        let stored = store
            .find_one(Collection::Users, &Filter::by_id(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["email"], "a@x.io");
        assert_eq!(stored["name"], "Ada");
    }

    #[tokio::test]
    async fn update_many_touches_every_match() {
        let store = MemoryStore::new();
        for category in ["To-Do", "To-Do", "Done"] {
            store
                .insert_one(Collection::Tasks, document(json!({"category": category})))
                .await
                .unwrap();
        }

        let outcome = store
            .update_many(
                Collection::Tasks,
                &Filter::all().eq("category", "To-Do"),
                &Update::set("category", "Doing"),
            )
            .await
            .unwrap();

        assert_eq!((outcome.matched_count, outcome.modified_count), (2, 2));
        let categories: Vec<_> = all(&store, Collection::Tasks, None)
            .await
            .into_iter()
            .map(|doc| doc["category"].clone())
            .collect();
        assert_eq!(categories, [json!("Doing"), json!("Doing"), json!("Done")]);
    }

    #[tokio::test]
    async fn sorted_find_breaks_ties_by_insertion_order() {
        let store = MemoryStore::new();
        for (title, order) in [("late", 30), ("first-tie", 10), ("second-tie", 10)] {
            store
                .insert_one(
                    Collection::Tasks,
                    document(json!({"title": title, "order": order})),
                )
                .await
                .unwrap();
        }

        let titles: Vec<_> = all(&store, Collection::Tasks, Some(Sort::ascending("order")))
            .await
            .into_iter()
            .map(|doc| doc["title"].clone())
            .collect();
        assert_eq!(titles, [json!("first-tie"), json!("second-tie"), json!("late")]);
    }

    #[tokio::test]
    async fn delete_one_removes_a_single_match() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Tasks, document(json!({"title": "A"})))
            .await
            .unwrap()
            .inserted_id;

        let first = store
            .delete_one(Collection::Tasks, &Filter::by_id(id))
            .await
            .unwrap();
        let second = store
            .delete_one(Collection::Tasks, &Filter::by_id(id))
            .await
            .unwrap();
        assert_eq!((first.deleted_count, second.deleted_count), (1, 0));
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .insert_one(Collection::Tutorials, document(json!({"reviewCount": 3})))
            .await
            .unwrap()
            .inserted_id;

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .find_one_and_update(
                            Collection::Tutorials,
                            &Filter::by_id(id),
                            &Update::increment("reviewCount", 1),
                        )
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store
            .find_one(Collection::Tutorials, &Filter::by_id(id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["reviewCount"], 53);
    }
}
