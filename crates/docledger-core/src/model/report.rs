//! Batch results reported back to the caller.

use serde::Serialize;

use crate::types::LogId;

/// Aggregate result of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// At least one document was modified; the audit record is kept.
    Modified,
    /// Nothing was modified; no audit record remains.
    NoChange,
    /// The confirmation gate declined the operation.
    Cancelled,
}

/// What happened to one document (or table row) of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DocumentStatus {
    Modified,
    /// Written, but the store reported no modification.
    Unchanged,
    /// No document matched.
    NotFound,
    /// The document lacks the field the operation requires.
    FieldAbsent,
    /// Not written, with the reason.
    Skipped(String),
    /// The write failed.
    Failed(String),
}

/// Per-document entry of a [`BatchReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOutcome {
    /// Business key (or match value) of the document.
    pub key: String,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

impl DocumentOutcome {
    pub fn new(key: impl Into<String>, status: DocumentStatus) -> Self {
        Self {
            key: key.into(),
            status,
        }
    }
}

/// Result of one logical batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Log id of the batch, if its audit record was kept.
    pub log_id: Option<LogId>,
    pub outcome: Outcome,
    /// Number of documents the store reported as modified.
    pub modified: u64,
    pub documents: Vec<DocumentOutcome>,
}

impl BatchReport {
    /// A batch that never got as far as creating an audit record.
    pub fn no_change(documents: Vec<DocumentOutcome>) -> Self {
        Self {
            log_id: None,
            outcome: Outcome::NoChange,
            modified: 0,
            documents,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            log_id: None,
            outcome: Outcome::Cancelled,
            modified: 0,
            documents: Vec::new(),
        }
    }

    /// Combine the reports of consecutive batches (e.g. one per input file).
    ///
    /// The result is `Modified` if any batch modified documents, otherwise
    /// `Cancelled` if any batch was declined.
    pub fn merge(reports: Vec<BatchReport>) -> Self {
        let mut merged = BatchReport::no_change(Vec::new());
        let mut cancelled = false;
        for report in reports {
            merged.modified += report.modified;
            merged.documents.extend(report.documents);
            match report.outcome {
                Outcome::Modified => {
                    merged.outcome = Outcome::Modified;
                    merged.log_id = report.log_id;
                }
                Outcome::Cancelled => cancelled = true,
                Outcome::NoChange => {}
            }
        }
        if cancelled && merged.outcome != Outcome::Modified {
            merged.outcome = Outcome::Cancelled;
        }
        merged
    }

    /// Number of documents that ended with `status`.
    pub fn count(&self, status: &DocumentStatus) -> usize {
        self.documents.iter().filter(|d| &d.status == status).count()
    }
}
