//! In-memory document store.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::document::{Document, ID_FIELD};
use crate::error::StoreError;
use crate::query::{Selector, Update};
use crate::traits::{DocumentStore, WriteResult};
use crate::types::DocumentId;
use crate::Result;

type Collections = BTreeMap<String, Vec<Document>>;

/// A [`DocumentStore`] kept entirely in memory.
///
/// Documents keep their insertion order. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

fn poisoned() -> StoreError {
    StoreError::Io {
        message: "memory store lock poisoned".to_string(),
    }
}

fn has_id(document: &Document, id: &DocumentId) -> bool {
    document.body().get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>> {
        Ok(self.collections.read().map_err(|_| poisoned())?)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>> {
        Ok(self.collections.write().map_err(|_| poisoned())?)
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> Result<usize> {
        Ok(self.read()?.get(collection).map_or(0, Vec::len))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn find_one(&self, collection: &str, selector: &Selector) -> Result<Option<Document>> {
        Ok(self.read()?.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| selector.matches(doc.body()))
                .cloned()
        }))
    }

    async fn find_many(&self, collection: &str, selector: &Selector) -> Result<Vec<Document>> {
        Ok(self
            .read()?
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| selector.matches(doc.body()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip(self, body))]
    async fn insert_one(&self, collection: &str, body: Map<String, Value>) -> Result<DocumentId> {
        let id = DocumentId::generate();
        self.write()?
            .entry(collection.to_string())
            .or_default()
            .push(Document::with_id(&id, body));
        debug!(%id, "Inserted document");
        Ok(id)
    }

    async fn write_one(
        &self,
        collection: &str,
        id: &DocumentId,
        update: &Update,
    ) -> Result<WriteResult> {
        let mut collections = self.write()?;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| has_id(doc, id)))
        else {
            return Ok(WriteResult::default());
        };

        let modified = update.apply_to(document);
        Ok(WriteResult {
            matched: true,
            modified,
        })
    }

    async fn delete_one(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        let mut collections = self.write()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| !has_id(doc, id));
        Ok(docs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldPath;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("study", body(json!({"stable_id": "S1"})))
            .await
            .unwrap();

        let found = store
            .find_one("study", &Selector::Id(id.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), id);
        assert_eq!(found.key("stable_id"), "S1");
        assert_eq!(store.list_collection_names().await.unwrap(), vec!["study"]);
    }

    #[tokio::test]
    async fn test_write_reports_modification() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("study", body(json!({"title": "a"})))
            .await
            .unwrap();
        let title = FieldPath::new("title").unwrap();

        let same = Update::new().set(title.clone(), json!("a"));
        let result = store.write_one("study", &id, &same).await.unwrap();
        assert!(result.matched && !result.modified);

        let changed = Update::new().set(title, json!("b"));
        let result = store.write_one("study", &id, &changed).await.unwrap();
        assert!(result.modified);

        let missing = store
            .write_one("study", &DocumentId::new("nope"), &changed)
            .await
            .unwrap();
        assert!(!missing.matched);
    }

    #[tokio::test]
    async fn test_bulk_write_counts() {
        let store = MemoryStore::new();
        let ids = store
            .insert_many(
                "run",
                vec![body(json!({"n": 1})), body(json!({"n": 2})), body(json!({"n": 3}))],
            )
            .await
            .unwrap();
        let n = FieldPath::new("n").unwrap();

        let writes = ids
            .iter()
            .map(|id| (id.clone(), Update::new().set(n.clone(), json!(2))))
            .collect();
        let result = store.bulk_write("run", writes).await.unwrap();

        assert_eq!(result.matched, 3);
        assert_eq!(result.modified, 2);
        assert_eq!(result.unchanged, vec![ids[1].clone()]);
        assert!(result.failures.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let id = store.insert_one("dac", Map::new()).await.unwrap();

        assert!(store.delete_one("dac", &id).await.unwrap());
        assert!(!store.delete_one("dac", &id).await.unwrap());
        assert_eq!(store.len("dac").unwrap(), 0);
        assert!(store.list_collection_names().await.unwrap().is_empty());
    }
}
