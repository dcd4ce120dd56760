//! Error types for docledger.
//!
//! This module provides a unified error type with explicit variants for
//! store failures, missing documents or fields, restore rejections and
//! input validation errors.

use thiserror::Error;

/// The unified error type for docledger operations.
///
/// A batch that modifies nothing is not an error; it is reported as
/// [`Outcome::NoChange`](crate::model::Outcome::NoChange).
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying store failed (I/O, serialization, corrupt data).
    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    /// A selector or log id matched nothing.
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// A field required by the operation is missing.
    #[error("field '{field}' is absent{}", location_suffix(.location))]
    FieldAbsent {
        field: String,
        location: Option<String>,
    },

    /// The targeted log entry cannot be restored.
    #[error("log entry {log_id} cannot be restored: {reason}")]
    NotRestorable { log_id: String, reason: String },

    /// Input validation errors (field paths, documents, tables).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

fn location_suffix(location: &Option<String>) -> String {
    match location {
        Some(location) => format!(" in {}", location),
        None => " in every document of the collection".to_string(),
    }
}

impl Error {
    /// A field missing from one specific document.
    pub fn field_absent_in(field: impl Into<String>, location: impl Into<String>) -> Self {
        Error::FieldAbsent {
            field: field.into(),
            location: Some(location.into()),
        }
    }

    /// A field missing from the whole collection.
    pub fn field_absent(field: impl Into<String>) -> Self {
        Error::FieldAbsent {
            field: field.into(),
            location: None,
        }
    }
}

/// Store-level errors, propagated unmodified to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem or transport failure.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// A document could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Persisted data violates an invariant (e.g. a document without `_id`).
    #[error("corrupt data in {location}: {reason}")]
    Corrupt { location: String, reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Store(StoreError::from(err))
    }
}

/// Lookups that matched nothing.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// No document matched the selector.
    #[error("no document in '{collection}' matches {selector}")]
    Document {
        collection: String,
        selector: String,
    },

    /// The document has no log entry with this id.
    #[error("log id {log_id} does not exist in {document}")]
    LogEntry { log_id: String, document: String },
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid dot-path.
    #[error("invalid field path '{value}': {reason}")]
    FieldPath { value: String, reason: String },

    /// Invalid document body.
    #[error("invalid document: {reason}")]
    Document { reason: String },

    /// Invalid update table.
    #[error("invalid table: {reason}")]
    Table { reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}
