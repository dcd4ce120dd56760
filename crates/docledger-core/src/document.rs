//! Validated document type.
//!
//! This module provides [`Document`], a schemaless JSON object that is
//! guaranteed to carry a store-assigned `_id`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, InvalidInputError};
use crate::model::LogEntry;
use crate::types::{DocumentId, FieldPath, FieldState};

/// The key holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

/// A stored document.
///
/// This type guarantees that:
/// - The value is a JSON object
/// - The object contains an `_id` field
/// - The `_id` field is a string
///
/// Everything else is open: fields map to scalars, lists or nested maps.
///
/// # Example
///
/// ```
/// use docledger_core::Document;
/// use serde_json::json;
///
/// let doc = Document::new(json!({
///     "_id": "65a1",
///     "stable_id": "EGAS0001",
///     "tags": ["a", "b"]
/// })).unwrap();
///
/// assert_eq!(doc.id().as_str(), "65a1");
/// assert_eq!(doc.key("stable_id"), "EGAS0001");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or lacks a string `_id`.
    pub fn new(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(body) => Self::from_body(body),
            _ => Err(InvalidInputError::Document {
                reason: "document must be a JSON object".to_string(),
            }
            .into()),
        }
    }

    /// Create a document from an object body that already carries `_id`.
    pub fn from_body(body: Map<String, Value>) -> Result<Self, Error> {
        match body.get(ID_FIELD) {
            Some(Value::String(_)) => Ok(Self(body)),
            Some(_) => Err(InvalidInputError::Document {
                reason: "_id field must be a string".to_string(),
            }
            .into()),
            None => Err(InvalidInputError::Document {
                reason: "document must contain an _id field".to_string(),
            }
            .into()),
        }
    }

    /// Assign `id` to a body, replacing any `_id` it had.
    pub fn with_id(id: &DocumentId, mut body: Map<String, Value>) -> Self {
        body.insert(ID_FIELD.to_string(), Value::String(id.as_str().to_string()));
        Self(body)
    }

    /// Returns the store-assigned identifier.
    pub fn id(&self) -> DocumentId {
        match self.0.get(ID_FIELD) {
            Some(Value::String(id)) => DocumentId::new(id.clone()),
            // Unreachable: validated at construction.
            _ => DocumentId::new(String::new()),
        }
    }

    /// Returns the business key as display text, or `<unknown>`.
    pub fn key(&self, key_field: &str) -> String {
        match self.0.get(key_field) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "<unknown>".to_string(),
        }
    }

    /// Get a reference to the object body.
    pub fn body(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutable access to the body. `_id` must be left untouched.
    pub fn body_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Consume and return the object body.
    pub fn into_body(self) -> Map<String, Value> {
        self.0
    }

    /// Read a (possibly nested) field.
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        path.get(&self.0)
    }

    /// Read a field with its presence.
    pub fn state(&self, path: &FieldPath) -> FieldState {
        FieldState::of(&self.0, path)
    }

    /// Parse the embedded change log stored under `log_field`, newest first.
    ///
    /// A document without a log has an empty history.
    pub fn log(&self, log_field: &str) -> Result<Vec<LogEntry>, Error> {
        match self.0.get(log_field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                InvalidInputError::Document {
                    reason: format!("malformed '{}' field: {}", log_field, e),
                }
                .into()
            }),
        }
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Document::new(value).map_err(serde::de::Error::custom)
    }
}
