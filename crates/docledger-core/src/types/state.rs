//! Presence-aware field values.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::FieldPath;

/// The marker persisted in logs for a field that did not exist.
pub const NON_EXISTING: &str = "Non-existing";

/// The state of a field at one point in its history.
///
/// A field can be missing altogether, which is different from holding
/// `null`. In persisted logs the missing state is written as the string
/// `"Non-existing"`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldState {
    /// The field did not exist.
    Missing,
    /// The field held this value (possibly `null`).
    Present(Value),
}

impl FieldState {
    /// Read the state of `path` in a document body.
    pub fn of(body: &Map<String, Value>, path: &FieldPath) -> Self {
        match path.get(body) {
            Some(value) => FieldState::Present(value.clone()),
            None => FieldState::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldState::Missing)
    }

    /// Returns the value if the field was present.
    pub fn value(&self) -> Option<&Value> {
        match self {
            FieldState::Missing => None,
            FieldState::Present(value) => Some(value),
        }
    }

    /// Whether the field held a JSON array.
    pub fn is_list(&self) -> bool {
        matches!(self, FieldState::Present(Value::Array(_)))
    }
}

impl From<Value> for FieldState {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) if s == NON_EXISTING => FieldState::Missing,
            other => FieldState::Present(other),
        }
    }
}

impl From<Option<Value>> for FieldState {
    fn from(value: Option<Value>) -> Self {
        value.map_or(FieldState::Missing, FieldState::from)
    }
}

impl Serialize for FieldState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldState::Missing => serializer.serialize_str(NON_EXISTING),
            FieldState::Present(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FieldState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(FieldState::from)
    }
}

/// Deserialize a present key into `Some`, keeping a JSON `null` as
/// `Some(FieldState::Present(Value::Null))` rather than `None`.
pub fn deserialize_some_state<'de, D>(deserializer: D) -> Result<Option<FieldState>, D::Error>
where
    D: Deserializer<'de>,
{
    FieldState::deserialize(deserializer).map(Some)
}
