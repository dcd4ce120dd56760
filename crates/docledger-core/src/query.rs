//! Selectors and per-document update operations.
//!
//! These are the store-neutral forms of "which documents" and "what to
//! change". Store implementations evaluate them with [`Selector::matches`]
//! and [`Update::apply`], so every backend agrees on their semantics.

use serde_json::{Map, Value};
use std::fmt;

use crate::document::{Document, ID_FIELD};
use crate::types::{DocumentId, FieldPath, LogId};

/// Which documents of a collection an operation reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Every document.
    All,
    /// The document with this store id.
    Id(DocumentId),
    /// Documents whose field equals the value.
    Eq(FieldPath, Value),
    /// Documents whose field equals any of the values.
    In(FieldPath, Vec<Value>),
    /// Documents where the field exists (null included).
    Exists(FieldPath),
    /// Documents where the field does not exist.
    Missing(FieldPath),
    /// Documents whose embedded log (under `log_field`) has an entry with this id.
    HasLogEntry { log_field: String, log_id: LogId },
}

impl Selector {
    /// Convenience for the common `{field: value}` selector.
    pub fn eq(field: FieldPath, value: impl Into<Value>) -> Self {
        Selector::Eq(field, value.into())
    }

    /// Whether a document body matches this selector.
    pub fn matches(&self, body: &Map<String, Value>) -> bool {
        match self {
            Selector::All => true,
            Selector::Id(id) => body.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()),
            Selector::Eq(path, value) => path.get(body) == Some(value),
            Selector::In(path, values) => path.get(body).is_some_and(|v| values.contains(v)),
            Selector::Exists(path) => path.exists(body),
            Selector::Missing(path) => !path.exists(body),
            Selector::HasLogEntry { log_field, log_id } => body
                .get(log_field)
                .and_then(Value::as_array)
                .is_some_and(|entries| {
                    entries
                        .iter()
                        .any(|entry| entry.get("log_id").and_then(Value::as_str) == Some(log_id.as_str()))
                }),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => write!(f, "{{}}"),
            Selector::Id(id) => write!(f, "{{_id: {}}}", id),
            Selector::Eq(path, value) => write!(f, "{{{}: {}}}", path, value),
            Selector::In(path, values) => write!(f, "{{{}: in {} values}}", path, values.len()),
            Selector::Exists(path) => write!(f, "{{{}: exists}}", path),
            Selector::Missing(path) => write!(f, "{{{}: missing}}", path),
            Selector::HasLogEntry { log_field, log_id } => {
                write!(f, "{{{}.log_id: {}}}", log_field, log_id)
            }
        }
    }
}

/// Changes applied atomically to one document.
///
/// Renames run first, then unsets, then sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub rename: Vec<(FieldPath, FieldPath)>,
    pub unset: Vec<FieldPath>,
    pub set: Vec<(FieldPath, Value)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: FieldPath, value: Value) -> Self {
        self.set.push((path, value));
        self
    }

    pub fn unset(mut self, path: FieldPath) -> Self {
        self.unset.push(path);
        self
    }

    pub fn rename(mut self, from: FieldPath, to: FieldPath) -> Self {
        self.rename.push((from, to));
        self
    }

    /// Apply the update to a body. Returns whether the body changed.
    ///
    /// Paths rooted at `_id` are ignored.
    pub fn apply(&self, body: &mut Map<String, Value>) -> bool {
        let before = body.clone();

        for (from, to) in &self.rename {
            if from.root() == ID_FIELD || to.root() == ID_FIELD {
                continue;
            }
            if let Some(value) = from.take(body) {
                to.set(body, value);
            }
        }

        for path in &self.unset {
            if path.root() != ID_FIELD {
                path.unset(body);
            }
        }

        for (path, value) in &self.set {
            if path.root() != ID_FIELD {
                path.set(body, value.clone());
            }
        }

        *body != before
    }

    /// Apply the update to a document. Returns whether it changed.
    pub fn apply_to(&self, document: &mut Document) -> bool {
        self.apply(document.body_mut())
    }
}
