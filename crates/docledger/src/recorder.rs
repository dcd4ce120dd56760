//! Audit records, provenance tables and per-document log entries.

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use docledger_core::error::{InvalidInputError, StoreError};
use docledger_core::{
    AuditRecord, Document, DocumentStore, FieldPath, FieldState, LedgerSettings, LogEntry, LogId,
    Operation, Operator, Result, Selector, UpdateTable,
};

use crate::tracker::{self, Change};

/// Writes and removes the bookkeeping of a batch.
#[derive(Clone, Copy)]
pub struct Recorder<'a> {
    store: &'a dyn DocumentStore,
    settings: &'a LedgerSettings,
}

impl<'a> Recorder<'a> {
    pub fn new(store: &'a dyn DocumentStore, settings: &'a LedgerSettings) -> Self {
        Self { store, settings }
    }

    /// Store a new audit record and return its id as the batch's log id.
    #[instrument(skip(self, operator))]
    pub async fn insert_audit_record(
        &self,
        operator: &Operator,
        operation: Operation,
        collection: &str,
    ) -> Result<LogId> {
        let record = AuditRecord::new(operator, operation, collection);
        let body = match serde_json::to_value(&record).map_err(StoreError::from)? {
            Value::Object(body) => body,
            _ => Map::new(),
        };

        let id = self
            .store
            .insert_one(&self.settings.audit_collection, body)
            .await?;
        debug!(log_id = %id, "Created audit record");
        Ok(LogId::from(id))
    }

    /// Read back the audit record of a batch.
    pub async fn audit_record(&self, log_id: &LogId) -> Result<Option<AuditRecord>> {
        let found = self
            .store
            .find_one(
                &self.settings.audit_collection,
                &Selector::Id(log_id.audit_record_id()),
            )
            .await?;

        match found {
            None => Ok(None),
            Some(document) => {
                let record = AuditRecord::from_value(Value::Object(document.into_body()))
                    .map_err(|e| StoreError::Corrupt {
                        location: format!("{}/{}", self.settings.audit_collection, log_id),
                        reason: e.to_string(),
                    })?;
                Ok(Some(record))
            }
        }
    }

    /// Delete the audit record of a batch. Deleting a missing record is fine.
    #[instrument(skip(self))]
    pub async fn delete_audit_record(&self, log_id: &LogId) -> Result<()> {
        let deleted = self
            .store
            .delete_one(&self.settings.audit_collection, &log_id.audit_record_id())
            .await?;
        if deleted {
            debug!("Deleted audit record");
        }
        Ok(())
    }

    /// Store the table of a table-driven batch, in chunks.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub async fn record_provenance(
        &self,
        log_id: &LogId,
        operation: Operation,
        table: &UpdateTable,
    ) -> Result<()> {
        let chunks = table.provenance_chunks(log_id, operation, self.settings.chunk_size);
        let count = chunks.len();
        self.store
            .insert_many(&self.settings.provenance_collection, chunks)
            .await?;
        debug!(chunks = count, "Recorded provenance");
        Ok(())
    }

    /// Delete every provenance chunk of a batch.
    pub async fn delete_provenance(&self, log_id: &LogId) -> Result<u64> {
        self.store
            .delete_many(
                &self.settings.provenance_collection,
                &Selector::Eq(log_id_path()?, Value::String(log_id.to_string())),
            )
            .await
    }

    /// Remove all bookkeeping of a batch: provenance first, then the audit
    /// record. The audit record is deleted even if provenance cleanup
    /// fails; the first error is returned.
    pub async fn discard(&self, log_id: &LogId) -> Result<()> {
        let provenance = self.delete_provenance(log_id).await;
        let audit = self.delete_audit_record(log_id).await;

        match provenance {
            Ok(chunks) => {
                if chunks > 0 {
                    debug!(%log_id, chunks, "Deleted provenance");
                }
                audit
            }
            Err(e) => {
                if let Err(audit_err) = audit {
                    warn!(%log_id, error = %audit_err, "Failed to delete audit record");
                }
                Err(e)
            }
        }
    }

    /// Build the log entry for a write of `field` from `previous` to `new`
    /// and return the document's new log.
    pub fn build_log_entry(
        &self,
        document: Option<&Document>,
        log_id: &LogId,
        operation: Operation,
        field: &FieldPath,
        previous: &FieldState,
        new: &FieldState,
    ) -> Result<Value> {
        let entry = match tracker::track(previous, new) {
            Change::Snapshot { previous, new } => {
                LogEntry::snapshot(log_id.clone(), operation, field.clone(), previous, new)
            }
            Change::Diff(diff) => LogEntry::diff(log_id.clone(), operation, field.clone(), diff),
        };
        self.prepend(document, &entry)
    }

    /// Return the document's log with `entry` placed first.
    ///
    /// Existing entries are kept as stored.
    pub fn prepend(&self, document: Option<&Document>, entry: &LogEntry) -> Result<Value> {
        let mut log = vec![serde_json::to_value(entry).map_err(StoreError::from)?];

        let existing = document.and_then(|doc| doc.body().get(&self.settings.log_field));
        match existing {
            None | Some(Value::Null) => {}
            Some(Value::Array(entries)) => log.extend(entries.iter().cloned()),
            Some(_) => {
                return Err(InvalidInputError::Document {
                    reason: format!("'{}' field is not a list", self.settings.log_field),
                }
                .into());
            }
        }

        Ok(Value::Array(log))
    }
}

fn log_id_path() -> Result<FieldPath> {
    FieldPath::new("log_id")
}
