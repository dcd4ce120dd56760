//! Bulk field mutations with per-document logging.
//!
//! Every batch follows the same shape: pick the documents to change, create
//! the batch's audit record, write each document's new value together with
//! its new log in one atomic update, then count what the store actually
//! modified. A batch that modified nothing leaves no audit record behind.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use docledger_core::error::{InvalidInputError, NotFoundError, StoreError};
use docledger_core::{
    BatchReport, Confirm, Document, DocumentId, DocumentOutcome, DocumentStatus, DocumentStore,
    Error, FieldPath, FieldState, LedgerSettings, LogEntry, LogId, Operation, Operator, Outcome,
    Result, Selector, Update, UpdateTable,
};

use crate::recorder::Recorder;

pub(crate) const VALUE_UNCHANGED: &str = "value unchanged";

/// Whether a set may create the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Only documents already holding the field are changed.
    Update,
    /// Missing fields are created.
    Upsert,
}

impl SetMode {
    fn operation(self, from_table: bool) -> Operation {
        match (self, from_table) {
            (SetMode::Update, false) => Operation::Update,
            (SetMode::Update, true) => Operation::UpdateWithFile,
            (SetMode::Upsert, _) => Operation::Upsert,
        }
    }
}

/// One document change, resolved into an update once the batch has a log id.
#[derive(Debug, Clone)]
pub(crate) enum Edit {
    Set {
        field: FieldPath,
        value: Value,
    },
    Unset {
        field: FieldPath,
    },
    Rename {
        from: FieldPath,
        to: FieldPath,
    },
    Restore {
        field: FieldPath,
        restored: FieldState,
        target: LogId,
    },
    RenameBack {
        from: FieldPath,
        to: FieldPath,
        target: LogId,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Planned {
    pub(crate) document: Document,
    pub(crate) edit: Edit,
}

/// Versioned mutations over a [`DocumentStore`].
///
/// Cloning is cheap; clones share the store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn DocumentStore>,
    settings: LedgerSettings,
}

impl Ledger {
    /// Create a ledger over a store with default settings.
    pub fn new(store: impl DocumentStore + 'static) -> Self {
        Self::from_shared(Arc::new(store))
    }

    /// Create a ledger over a store that is also used elsewhere.
    pub fn from_shared(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            settings: LedgerSettings::default(),
        }
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: LedgerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// The bookkeeping writer bound to this ledger's store.
    pub fn recorder(&self) -> Recorder<'_> {
        Recorder::new(self.store.as_ref(), &self.settings)
    }

    pub(crate) fn key_of(&self, document: &Document) -> String {
        document.key(&self.settings.key_field)
    }

    fn log_path(&self) -> Result<FieldPath> {
        FieldPath::new(&self.settings.log_field)
    }

    /// Reject fields the ledger manages itself.
    pub(crate) fn check_target(&self, field: &FieldPath) -> Result<()> {
        let root = field.root();
        if root == docledger_core::document::ID_FIELD || root == self.settings.log_field {
            return Err(InvalidInputError::Other {
                message: format!("field '{}' is managed by docledger and cannot be modified", field),
            }
            .into());
        }
        Ok(())
    }

    pub(crate) async fn find_document(
        &self,
        collection: &str,
        selector: &Selector,
    ) -> Result<Document> {
        self.store
            .find_one(collection, selector)
            .await?
            .ok_or_else(|| {
                NotFoundError::Document {
                    collection: collection.to_string(),
                    selector: selector.to_string(),
                }
                .into()
            })
    }

    /// Set `field` on the first document matching `selector`.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing matches; `FieldAbsent` in update mode when the
    /// document lacks the field.
    #[instrument(skip_all, fields(%collection, %selector, %field, ?mode))]
    pub async fn set_one(
        &self,
        collection: &str,
        selector: &Selector,
        field: &FieldPath,
        value: Value,
        mode: SetMode,
        operator: &Operator,
    ) -> Result<BatchReport> {
        self.check_target(field)?;
        let document = self.find_document(collection, selector).await?;
        let key = self.key_of(&document);

        match mode {
            SetMode::Update if !field.exists(document.body()) => {
                return Err(Error::field_absent_in(
                    field.to_string(),
                    format!("document {}", key),
                ));
            }
            SetMode::Upsert if document.get(field) == Some(&value) => {
                debug!(%key, "Value unchanged");
                return Ok(BatchReport::no_change(vec![DocumentOutcome::new(
                    key,
                    DocumentStatus::Skipped(VALUE_UNCHANGED.to_string()),
                )]));
            }
            _ => {}
        }

        let planned = Planned {
            document,
            edit: Edit::Set {
                field: field.clone(),
                value,
            },
        };
        self.commit(collection, operator, mode.operation(false), vec![planned], Vec::new(), None)
            .await
    }

    /// Set `field` on every document.
    ///
    /// In update mode only documents holding the field are touched; when none
    /// do, the batch is a no-op without an audit record.
    #[instrument(skip_all, fields(%collection, %field, ?mode))]
    pub async fn set_all(
        &self,
        collection: &str,
        field: &FieldPath,
        value: Value,
        mode: SetMode,
        operator: &Operator,
    ) -> Result<BatchReport> {
        self.check_target(field)?;

        let selector = match mode {
            SetMode::Update => Selector::Exists(field.clone()),
            SetMode::Upsert => Selector::All,
        };
        let documents = self.store.find_many(collection, &selector).await?;
        if documents.is_empty() {
            info!("No document to update");
            return Ok(BatchReport::no_change(Vec::new()));
        }

        let mut outcomes = Vec::new();
        let mut plans = Vec::with_capacity(documents.len());
        for document in documents {
            if mode == SetMode::Upsert && document.get(field) == Some(&value) {
                outcomes.push(DocumentOutcome::new(
                    self.key_of(&document),
                    DocumentStatus::Skipped(VALUE_UNCHANGED.to_string()),
                ));
                continue;
            }
            plans.push(Planned {
                document,
                edit: Edit::Set {
                    field: field.clone(),
                    value: value.clone(),
                },
            });
        }

        self.commit(collection, operator, mode.operation(false), plans, outcomes, None)
            .await
    }

    /// Apply an update table: each row sets the target field of the document
    /// whose match field equals the row key.
    ///
    /// Rows whose document already holds the value are skipped. With
    /// `reset_unlisted`, documents not named by any row get the field set to
    /// null. The table is kept as the batch's provenance.
    #[instrument(skip_all, fields(%collection, field = %table.target_field, rows = table.len(), ?mode))]
    pub async fn set_from_table(
        &self,
        collection: &str,
        table: &UpdateTable,
        mode: SetMode,
        reset_unlisted: bool,
        operator: &Operator,
    ) -> Result<BatchReport> {
        let field = &table.target_field;
        self.check_target(field)?;

        let candidates = self
            .store
            .find_many(collection, &Selector::Exists(table.match_field.clone()))
            .await?;

        let mut index: HashMap<String, usize> = HashMap::with_capacity(candidates.len());
        for (position, document) in candidates.iter().enumerate() {
            if let Some(value) = document.get(&table.match_field) {
                index.entry(match_text(value)).or_insert(position);
            }
        }

        let mut last_row: HashMap<String, usize> = HashMap::with_capacity(table.len());
        for (row_index, row) in table.rows.iter().enumerate() {
            last_row.insert(match_text(&row.key), row_index);
        }

        let mut outcomes = Vec::new();
        let mut plans = Vec::new();
        let mut listed: HashSet<DocumentId> = HashSet::new();

        for (row_index, row) in table.rows.iter().enumerate() {
            let key = match_text(&row.key);

            let Some(&position) = index.get(&key) else {
                warn!(%key, "No document matches table row");
                outcomes.push(DocumentOutcome::new(key, DocumentStatus::NotFound));
                continue;
            };
            let document = &candidates[position];
            listed.insert(document.id());

            if last_row.get(&key) != Some(&row_index) {
                outcomes.push(DocumentOutcome::new(
                    key,
                    DocumentStatus::Skipped("superseded by a later row".to_string()),
                ));
                continue;
            }
            if mode == SetMode::Update && !field.exists(document.body()) {
                warn!(%key, %field, "Document lacks the field");
                outcomes.push(DocumentOutcome::new(key, DocumentStatus::FieldAbsent));
                continue;
            }
            if document.get(field) == Some(&row.value) {
                outcomes.push(DocumentOutcome::new(
                    key,
                    DocumentStatus::Skipped(VALUE_UNCHANGED.to_string()),
                ));
                continue;
            }

            plans.push(Planned {
                document: document.clone(),
                edit: Edit::Set {
                    field: field.clone(),
                    value: row.value.clone(),
                },
            });
        }

        if reset_unlisted {
            let selector = match mode {
                SetMode::Update => Selector::Exists(field.clone()),
                SetMode::Upsert => Selector::All,
            };
            for document in self.store.find_many(collection, &selector).await? {
                if listed.contains(&document.id()) || document.get(field) == Some(&Value::Null) {
                    continue;
                }
                debug!(key = %self.key_of(&document), "Resetting unlisted document");
                plans.push(Planned {
                    document,
                    edit: Edit::Set {
                        field: field.clone(),
                        value: Value::Null,
                    },
                });
            }
        }

        self.commit(collection, operator, mode.operation(true), plans, outcomes, Some(table))
            .await
    }

    /// Create `field` as null in every document lacking it.
    #[instrument(skip_all, fields(%collection, %field))]
    pub async fn add_empty_field(
        &self,
        collection: &str,
        field: &FieldPath,
        operator: &Operator,
    ) -> Result<BatchReport> {
        self.check_target(field)?;

        let documents = self
            .store
            .find_many(collection, &Selector::Missing(field.clone()))
            .await?;
        if documents.is_empty() {
            info!("Every document already holds the field");
            return Ok(BatchReport::no_change(Vec::new()));
        }

        let plans = documents
            .into_iter()
            .map(|document| Planned {
                document,
                edit: Edit::Set {
                    field: field.clone(),
                    value: Value::Null,
                },
            })
            .collect();

        self.commit(collection, operator, Operation::AddEmptyField, plans, Vec::new(), None)
            .await
    }

    /// Rename `from` to `to` in every document holding `from`.
    ///
    /// Documents that already hold `to` are skipped.
    ///
    /// # Errors
    ///
    /// `FieldAbsent` if no document holds `from`.
    #[instrument(skip_all, fields(%collection, %from, %to))]
    pub async fn rename(
        &self,
        collection: &str,
        from: &FieldPath,
        to: &FieldPath,
        operator: &Operator,
    ) -> Result<BatchReport> {
        self.check_target(from)?;
        self.check_target(to)?;
        if from.starts_with(to) || to.starts_with(from) {
            return Err(InvalidInputError::Other {
                message: format!("cannot rename '{}' to '{}'", from, to),
            }
            .into());
        }

        let documents = self
            .store
            .find_many(collection, &Selector::Exists(from.clone()))
            .await?;
        if documents.is_empty() {
            return Err(Error::field_absent(from.to_string()));
        }

        let mut outcomes = Vec::new();
        let mut plans = Vec::with_capacity(documents.len());
        for document in documents {
            if to.exists(document.body()) {
                let key = self.key_of(&document);
                warn!(%key, %to, "Target field already exists");
                outcomes.push(DocumentOutcome::new(
                    key,
                    DocumentStatus::Skipped(format!("field '{}' already exists", to)),
                ));
                continue;
            }
            plans.push(Planned {
                document,
                edit: Edit::Rename {
                    from: from.clone(),
                    to: to.clone(),
                },
            });
        }

        self.commit(collection, operator, Operation::Rename, plans, outcomes, None)
            .await
    }

    /// Remove `field` from every document holding it, once `confirm` agrees.
    ///
    /// # Errors
    ///
    /// `FieldAbsent` if no document holds the field.
    #[instrument(skip_all, fields(%collection, %field))]
    pub async fn remove(
        &self,
        collection: &str,
        field: &FieldPath,
        confirm: &dyn Confirm,
        operator: &Operator,
    ) -> Result<BatchReport> {
        self.check_target(field)?;

        let documents = self
            .store
            .find_many(collection, &Selector::Exists(field.clone()))
            .await?;
        if documents.is_empty() {
            return Err(Error::field_absent(field.to_string()));
        }

        let prompt = format!(
            "Remove field '{}' from {} document(s) of '{}'?",
            field,
            documents.len(),
            collection
        );
        if !confirm.confirm(&prompt) {
            info!("Removal cancelled");
            return Ok(BatchReport::cancelled());
        }

        let plans = documents
            .into_iter()
            .map(|document| Planned {
                document,
                edit: Edit::Unset {
                    field: field.clone(),
                },
            })
            .collect();

        self.commit(collection, operator, Operation::Remove, plans, Vec::new(), None)
            .await
    }

    /// Insert new documents, skipping keys already present.
    ///
    /// Each chunk of inserted documents gets its own audit record, and every
    /// document starts its log with an insert entry.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if a document has no business key; nothing is inserted.
    #[instrument(skip_all, fields(%collection, count = documents.len()))]
    pub async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<Map<String, Value>>,
        operator: &Operator,
    ) -> Result<BatchReport> {
        let key_path = FieldPath::new(&self.settings.key_field)?;

        let mut keys = Vec::with_capacity(documents.len());
        for (position, body) in documents.iter().enumerate() {
            match key_path.get(body) {
                None | Some(Value::Null) => {
                    return Err(InvalidInputError::Document {
                        reason: format!(
                            "document {} has no '{}' field",
                            position + 1,
                            self.settings.key_field
                        ),
                    }
                    .into());
                }
                Some(key) => keys.push(key.clone()),
            }
        }

        let existing: HashSet<String> = self
            .store
            .find_many(collection, &Selector::In(key_path.clone(), keys))
            .await?
            .iter()
            .filter_map(|document| document.get(&key_path).map(match_text))
            .collect();

        let mut outcomes = Vec::new();
        let mut fresh = Vec::new();
        let mut seen = HashSet::new();
        for body in documents {
            let key = key_path.get(&body).map(match_text).unwrap_or_default();
            if existing.contains(&key) {
                debug!(%key, "Document already exists");
                outcomes.push(DocumentOutcome::new(
                    key,
                    DocumentStatus::Skipped("already exists".to_string()),
                ));
            } else if !seen.insert(key.clone()) {
                outcomes.push(DocumentOutcome::new(
                    key,
                    DocumentStatus::Skipped("duplicate in input".to_string()),
                ));
            } else {
                fresh.push((key, body));
            }
        }

        let mut reports = vec![BatchReport::no_change(outcomes)];
        let mut fresh = fresh.into_iter().peekable();
        while fresh.peek().is_some() {
            let chunk: Vec<_> = fresh.by_ref().take(self.settings.chunk_size.max(1)).collect();
            reports.push(self.insert_chunk(collection, chunk, operator).await?);
        }

        Ok(BatchReport::merge(reports))
    }

    async fn insert_chunk(
        &self,
        collection: &str,
        chunk: Vec<(String, Map<String, Value>)>,
        operator: &Operator,
    ) -> Result<BatchReport> {
        let recorder = self.recorder();
        let log_id = recorder
            .insert_audit_record(operator, Operation::Insert, collection)
            .await?;

        let inserted = self.insert_stamped(collection, &log_id, chunk).await;
        match inserted {
            Ok(keys) => {
                info!(%log_id, inserted = keys.len(), "Inserted documents");
                Ok(BatchReport {
                    log_id: Some(log_id),
                    outcome: Outcome::Modified,
                    modified: keys.len() as u64,
                    documents: keys
                        .into_iter()
                        .map(|key| DocumentOutcome::new(key, DocumentStatus::Modified))
                        .collect(),
                })
            }
            Err(e) => {
                // Documents written before the failure still reference the record.
                let landed = Selector::HasLogEntry {
                    log_field: self.settings.log_field.clone(),
                    log_id: log_id.clone(),
                };
                match self.store.find_one(collection, &landed).await {
                    Ok(None) => {
                        if let Err(cleanup) = recorder.discard(&log_id).await {
                            warn!(%log_id, error = %cleanup, "Failed to discard audit record");
                        }
                    }
                    Ok(Some(_)) => {
                        warn!(%log_id, error = %e, "Insert failed partway, keeping audit record");
                    }
                    Err(check) => {
                        warn!(%log_id, error = %check, "Could not check inserted documents, keeping audit record");
                    }
                }
                Err(e)
            }
        }
    }

    async fn insert_stamped(
        &self,
        collection: &str,
        log_id: &LogId,
        chunk: Vec<(String, Map<String, Value>)>,
    ) -> Result<Vec<String>> {
        let entry = serde_json::to_value(LogEntry::insert(log_id.clone())).map_err(StoreError::from)?;

        let mut keys = Vec::with_capacity(chunk.len());
        let mut bodies = Vec::with_capacity(chunk.len());
        for (key, mut body) in chunk {
            body.insert(
                self.settings.log_field.clone(),
                Value::Array(vec![entry.clone()]),
            );
            keys.push(key);
            bodies.push(body);
        }

        self.store.insert_many(collection, bodies).await?;
        Ok(keys)
    }

    /// Run a planned batch under a fresh audit record.
    ///
    /// The audit record (and provenance) is removed again if the batch
    /// modified nothing or failed before writing.
    pub(crate) async fn commit(
        &self,
        collection: &str,
        operator: &Operator,
        operation: Operation,
        plans: Vec<Planned>,
        mut outcomes: Vec<DocumentOutcome>,
        table: Option<&UpdateTable>,
    ) -> Result<BatchReport> {
        if plans.is_empty() {
            info!(%operation, "Nothing to write");
            return Ok(BatchReport::no_change(outcomes));
        }

        let recorder = self.recorder();
        let log_id = recorder
            .insert_audit_record(operator, operation, collection)
            .await?;

        let written = self
            .write_plans(collection, &log_id, operation, plans, table, &mut outcomes)
            .await;
        let modified = match written {
            Ok(modified) => modified,
            Err(e) => {
                if let Err(cleanup) = recorder.discard(&log_id).await {
                    warn!(%log_id, error = %cleanup, "Failed to discard audit record");
                }
                return Err(e);
            }
        };

        if modified == 0 {
            info!(%log_id, %operation, "No document modified, discarding audit record");
            recorder.discard(&log_id).await?;
            return Ok(BatchReport {
                log_id: None,
                outcome: Outcome::NoChange,
                modified: 0,
                documents: outcomes,
            });
        }

        info!(%log_id, %operation, modified, "Batch applied");
        Ok(BatchReport {
            log_id: Some(log_id),
            outcome: Outcome::Modified,
            modified,
            documents: outcomes,
        })
    }

    async fn write_plans(
        &self,
        collection: &str,
        log_id: &LogId,
        operation: Operation,
        plans: Vec<Planned>,
        table: Option<&UpdateTable>,
        outcomes: &mut Vec<DocumentOutcome>,
    ) -> Result<u64> {
        let recorder = self.recorder();
        if let Some(table) = table {
            recorder.record_provenance(log_id, operation, table).await?;
        }

        let log_path = self.log_path()?;
        let mut modified = 0;
        let mut plans = plans.into_iter().peekable();

        while plans.peek().is_some() {
            let chunk: Vec<Planned> = plans.by_ref().take(self.settings.chunk_size.max(1)).collect();

            let mut targets = Vec::with_capacity(chunk.len());
            let mut writes = Vec::with_capacity(chunk.len());
            for planned in &chunk {
                let key = self.key_of(&planned.document);
                match self.build_update(&recorder, planned, log_id, operation, &log_path) {
                    Ok(update) => {
                        let id = planned.document.id();
                        targets.push((id.clone(), key));
                        writes.push((id, update));
                    }
                    Err(e) => {
                        warn!(%key, error = %e, "Skipping document");
                        outcomes.push(DocumentOutcome::new(key, DocumentStatus::Failed(e.to_string())));
                    }
                }
            }
            if writes.is_empty() {
                continue;
            }

            match self.store.bulk_write(collection, writes).await {
                Ok(result) => {
                    modified += result.modified;
                    let unchanged: HashSet<DocumentId> = result.unchanged.into_iter().collect();
                    let failures: HashMap<DocumentId, String> = result
                        .failures
                        .into_iter()
                        .map(|failure| (failure.id, failure.message))
                        .collect();

                    for (id, key) in targets {
                        let status = if let Some(message) = failures.get(&id) {
                            DocumentStatus::Failed(message.clone())
                        } else if unchanged.contains(&id) {
                            DocumentStatus::Unchanged
                        } else {
                            DocumentStatus::Modified
                        };
                        outcomes.push(DocumentOutcome::new(key, status));
                    }
                }
                Err(e) => {
                    warn!(error = %e, documents = targets.len(), "Bulk write failed");
                    for (_, key) in targets {
                        outcomes.push(DocumentOutcome::new(key, DocumentStatus::Failed(e.to_string())));
                    }
                }
            }
            debug!(modified, "Chunk written");
        }

        Ok(modified)
    }

    fn build_update(
        &self,
        recorder: &Recorder<'_>,
        planned: &Planned,
        log_id: &LogId,
        operation: Operation,
        log_path: &FieldPath,
    ) -> Result<Update> {
        let document = &planned.document;

        let update = match &planned.edit {
            Edit::Set { field, value } => {
                let log = recorder.build_log_entry(
                    Some(document),
                    log_id,
                    operation,
                    field,
                    &document.state(field),
                    &FieldState::Present(value.clone()),
                )?;
                Update::new()
                    .set(field.clone(), value.clone())
                    .set(log_path.clone(), log)
            }
            Edit::Unset { field } => {
                let log = recorder.build_log_entry(
                    Some(document),
                    log_id,
                    operation,
                    field,
                    &document.state(field),
                    &FieldState::Missing,
                )?;
                Update::new()
                    .unset(field.clone())
                    .set(log_path.clone(), log)
            }
            Edit::Rename { from, to } => {
                let log = recorder.prepend(Some(document), &LogEntry::rename(log_id.clone(), from, to))?;
                Update::new()
                    .rename(from.clone(), to.clone())
                    .set(log_path.clone(), log)
            }
            Edit::Restore {
                field,
                restored,
                target,
            } => {
                let entry = LogEntry::restore(
                    log_id.clone(),
                    field.clone(),
                    document.state(field),
                    restored.clone(),
                    target.clone(),
                );
                let log = recorder.prepend(Some(document), &entry)?;
                let update = match restored {
                    FieldState::Missing => Update::new().unset(field.clone()),
                    FieldState::Present(value) => Update::new().set(field.clone(), value.clone()),
                };
                update.set(log_path.clone(), log)
            }
            Edit::RenameBack { from, to, target } => {
                let entry = LogEntry::restore(
                    log_id.clone(),
                    to.clone(),
                    FieldState::Present(Value::String(from.to_string())),
                    FieldState::Present(Value::String(to.to_string())),
                    target.clone(),
                );
                let log = recorder.prepend(Some(document), &entry)?;
                Update::new()
                    .rename(from.clone(), to.clone())
                    .set(log_path.clone(), log)
            }
        };

        Ok(update)
    }
}

/// Text used to match a table key against a document value.
pub(crate) fn match_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
