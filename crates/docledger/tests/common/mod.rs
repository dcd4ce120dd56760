//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};

use docledger::Ledger;
use docledger_core::error::StoreError;
use docledger_core::traits::{BulkWriteResult, DocumentStore, WriteResult};
use docledger_core::{
    Document, DocumentId, FieldPath, MemoryStore, Operator, Result, Selector, Update,
};

pub const COLLECTION: &str = "study";

pub fn path(s: &str) -> FieldPath {
    FieldPath::new(s).unwrap()
}

pub fn operator() -> Operator {
    Operator::new("Test Curator", "integration test")
}

pub fn body(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

pub fn key(stable_id: &str) -> Selector {
    Selector::eq(path("stable_id"), stable_id)
}

/// A ledger over a fresh memory store holding `documents` in COLLECTION.
pub async fn seeded(documents: Vec<Value>) -> (Arc<MemoryStore>, Ledger) {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_many(COLLECTION, documents.into_iter().map(body).collect())
        .await
        .unwrap();
    let ledger = Ledger::from_shared(store.clone());
    (store, ledger)
}

pub async fn document(ledger: &Ledger, stable_id: &str) -> Document {
    ledger
        .store()
        .find_one(COLLECTION, &key(stable_id))
        .await
        .unwrap()
        .unwrap()
}

/// Elements of a value as sorted JSON text, for order-insensitive checks.
pub fn as_set(value: Option<&Value>) -> Vec<String> {
    let mut items: Vec<String> = docledger::tracker::as_sequence(value)
        .iter()
        .map(Value::to_string)
        .collect();
    items.sort();
    items
}

/// Audit ids stored in the audit collection.
pub async fn audit_ids(ledger: &Ledger) -> HashSet<String> {
    ledger
        .store()
        .find_many(&ledger.settings().audit_collection, &Selector::All)
        .await
        .unwrap()
        .iter()
        .map(|doc| doc.id().to_string())
        .collect()
}

/// Log ids referenced by any document of the collection.
pub async fn referenced_log_ids(ledger: &Ledger, collection: &str) -> HashSet<String> {
    let mut ids = HashSet::new();
    for doc in ledger
        .store()
        .find_many(collection, &Selector::All)
        .await
        .unwrap()
    {
        for entry in doc.log(&ledger.settings().log_field).unwrap() {
            ids.insert(entry.log_id.to_string());
        }
    }
    ids
}

/// A store that accepts writes to some documents without changing them,
/// counts bulk round trips, and can be told to fail inserts or deletes.
pub struct StubbornStore {
    pub inner: MemoryStore,
    pub ignored: HashSet<DocumentId>,
    pub bulk_calls: AtomicUsize,
    /// Inserts into COLLECTION beyond this many fail.
    pub insert_budget: Option<usize>,
    pub inserts: AtomicUsize,
    /// Collections whose `delete_many` fails.
    pub failing_deletes: HashSet<String>,
}

fn io_failure(message: &str) -> docledger_core::Error {
    StoreError::Io {
        message: message.to_string(),
    }
    .into()
}

impl StubbornStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ignored: HashSet::new(),
            bulk_calls: AtomicUsize::new(0),
            insert_budget: None,
            inserts: AtomicUsize::new(0),
            failing_deletes: HashSet::new(),
        }
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for StubbornStore {
    async fn list_collection_names(&self) -> Result<Vec<String>> {
        self.inner.list_collection_names().await
    }

    async fn find_one(&self, collection: &str, selector: &Selector) -> Result<Option<Document>> {
        self.inner.find_one(collection, selector).await
    }

    async fn find_many(&self, collection: &str, selector: &Selector) -> Result<Vec<Document>> {
        self.inner.find_many(collection, selector).await
    }

    async fn insert_one(&self, collection: &str, body: Map<String, Value>) -> Result<DocumentId> {
        if collection == COLLECTION
            && let Some(budget) = self.insert_budget
            && self.inserts.fetch_add(1, Ordering::SeqCst) >= budget
        {
            return Err(io_failure("disk full"));
        }
        self.inner.insert_one(collection, body).await
    }

    async fn write_one(
        &self,
        collection: &str,
        id: &DocumentId,
        update: &Update,
    ) -> Result<WriteResult> {
        if self.ignored.contains(id) {
            return Ok(WriteResult {
                matched: true,
                modified: false,
            });
        }
        self.inner.write_one(collection, id, update).await
    }

    async fn bulk_write(
        &self,
        collection: &str,
        writes: Vec<(DocumentId, Update)>,
    ) -> Result<BulkWriteResult> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let mut result = BulkWriteResult::default();
        for (id, update) in writes {
            let write = self.write_one(collection, &id, &update).await?;
            result.record(id, write);
        }
        Ok(result)
    }

    async fn delete_one(&self, collection: &str, id: &DocumentId) -> Result<bool> {
        self.inner.delete_one(collection, id).await
    }

    async fn delete_many(&self, collection: &str, selector: &Selector) -> Result<u64> {
        if self.failing_deletes.contains(collection) {
            return Err(io_failure("permission denied"));
        }
        self.inner.delete_many(collection, selector).await
    }
}
