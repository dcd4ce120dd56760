//! docledger-core - Core types and traits for field-level document history.

pub mod document;
pub mod error;
pub mod memory;
pub mod model;
pub mod query;
pub mod settings;
pub mod traits;
pub mod types;

pub use document::Document;
pub use error::Error;
pub use memory::MemoryStore;
pub use model::{
    AuditRecord, BatchReport, DocumentOutcome, DocumentStatus, LogEntry, Operation, Operator,
    Outcome, Recorded, UpdateTable, ValueDiff,
};
pub use query::{Selector, Update};
pub use settings::LedgerSettings;
pub use traits::{AlwaysConfirm, BulkWriteResult, Confirm, DocumentStore, WriteResult};
pub use types::{DocumentId, FieldPath, FieldState, LogId};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
