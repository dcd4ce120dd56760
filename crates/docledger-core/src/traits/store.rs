//! Document store trait.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use crate::document::Document;
use crate::query::{Selector, Update};
use crate::types::DocumentId;
use crate::Result;

/// Result of a single-document write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteResult {
    /// A document with the id existed.
    pub matched: bool,
    /// The document's content actually changed.
    pub modified: bool,
}

/// A write inside a bulk request that did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub id: DocumentId,
    pub message: String,
}

/// Result of a bulk write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub matched: u64,
    pub modified: u64,
    /// Ids that were written without any change (or matched nothing).
    pub unchanged: Vec<DocumentId>,
    /// Ids whose write failed; the rest of the batch still applies.
    pub failures: Vec<WriteFailure>,
}

impl BulkWriteResult {
    /// Fold the result of writing `id` into the totals.
    pub fn record(&mut self, id: DocumentId, result: WriteResult) {
        self.matched += u64::from(result.matched);
        self.modified += u64::from(result.modified);
        if !result.modified {
            self.unchanged.push(id);
        }
    }
}

/// A schemaless document store.
///
/// Collections are addressed by name and hold [`Document`]s keyed by a
/// store-assigned [`DocumentId`]. Writes are atomic per document; there is
/// no transaction across documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Names of all collections holding at least one document.
    async fn list_collection_names(&self) -> Result<Vec<String>>;

    /// First document matching the selector, in store order.
    async fn find_one(&self, collection: &str, selector: &Selector) -> Result<Option<Document>>;

    /// All documents matching the selector, in store order.
    async fn find_many(&self, collection: &str, selector: &Selector) -> Result<Vec<Document>>;

    /// Insert a document and return the id the store assigned to it.
    ///
    /// Any `_id` in `body` is replaced.
    async fn insert_one(&self, collection: &str, body: Map<String, Value>) -> Result<DocumentId>;

    /// Insert several documents, returning their ids in input order.
    async fn insert_many(
        &self,
        collection: &str,
        bodies: Vec<Map<String, Value>>,
    ) -> Result<Vec<DocumentId>> {
        let mut ids = Vec::with_capacity(bodies.len());
        for body in bodies {
            ids.push(self.insert_one(collection, body).await?);
        }
        Ok(ids)
    }

    /// Apply an update to one document atomically.
    async fn write_one(
        &self,
        collection: &str,
        id: &DocumentId,
        update: &Update,
    ) -> Result<WriteResult>;

    /// Apply many per-document updates in one request.
    ///
    /// A failing write is reported in [`BulkWriteResult::failures`] and does
    /// not undo the others.
    async fn bulk_write(
        &self,
        collection: &str,
        writes: Vec<(DocumentId, Update)>,
    ) -> Result<BulkWriteResult> {
        let mut result = BulkWriteResult::default();
        for (id, update) in writes {
            match self.write_one(collection, &id, &update).await {
                Ok(write) => result.record(id, write),
                Err(e) => {
                    warn!(%id, error = %e, "Write failed");
                    result.failures.push(WriteFailure {
                        id,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(result)
    }

    /// Delete a document. Returns whether it existed.
    async fn delete_one(&self, collection: &str, id: &DocumentId) -> Result<bool>;

    /// Delete every matching document. Returns how many were deleted.
    async fn delete_many(&self, collection: &str, selector: &Selector) -> Result<u64> {
        let mut deleted = 0;
        for document in self.find_many(collection, selector).await? {
            if self.delete_one(collection, &document.id()).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
