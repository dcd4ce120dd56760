//! Dot-path field addressing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A validated path to a (possibly nested) document field.
///
/// Paths are written in dot notation (`archived_at.crg`) and stored as the
/// ordered list of keys. All nested reads and writes go through this type
/// instead of splitting strings at each call site.
///
/// # Example
///
/// ```
/// use docledger_core::FieldPath;
/// use serde_json::{Map, json};
///
/// let path = FieldPath::new("archived_at.crg").unwrap();
/// let mut body = Map::new();
/// path.set(&mut body, json!(true));
///
/// assert_eq!(path.get(&body), Some(&json!(true)));
/// assert_eq!(path.segments(), ["archived_at", "crg"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dot-path, validating every segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the path or any of its segments is empty, or a
    /// segment starts with `$`.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();

        if s.is_empty() {
            return Err(InvalidInputError::FieldPath {
                value: s.to_string(),
                reason: "cannot be empty".to_string(),
            }
            .into());
        }

        let segments: Vec<String> = s.split('.').map(str::to_string).collect();

        for segment in &segments {
            if segment.is_empty() {
                return Err(InvalidInputError::FieldPath {
                    value: s.to_string(),
                    reason: "contains an empty segment".to_string(),
                }
                .into());
            }
            if segment.starts_with('$') {
                return Err(InvalidInputError::FieldPath {
                    value: s.to_string(),
                    reason: format!("segment '{}' cannot start with '$'", segment),
                }
                .into());
            }
        }

        Ok(Self(segments))
    }

    /// Returns the keys of this path, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the top-level key this path starts with.
    pub fn root(&self) -> &str {
        &self.0[0]
    }

    /// Whether `self` equals `other` or lies underneath it.
    pub fn starts_with(&self, other: &FieldPath) -> bool {
        self.0.len() >= other.0.len() && self.0[..other.0.len()] == other.0[..]
    }

    /// Read the value at this path.
    pub fn get<'a>(&self, body: &'a Map<String, Value>) -> Option<&'a Value> {
        let (last, parents) = self.0.split_last()?;
        let mut current = body;
        for key in parents {
            current = current.get(key)?.as_object()?;
        }
        current.get(last)
    }

    /// Whether a value (null included) exists at this path.
    pub fn exists(&self, body: &Map<String, Value>) -> bool {
        self.get(body).is_some()
    }

    /// Write a value at this path, creating intermediate maps.
    ///
    /// Non-object values found on the way are replaced by empty maps.
    pub fn set(&self, body: &mut Map<String, Value>, value: Value) {
        let Some((last, parents)) = self.0.split_last() else {
            return;
        };
        let mut current = body;
        for key in parents {
            let slot = current
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.clone(), value);
    }

    /// Remove and return the value at this path.
    pub fn take(&self, body: &mut Map<String, Value>) -> Option<Value> {
        let (last, parents) = self.0.split_last()?;
        let mut current = body;
        for key in parents {
            current = current.get_mut(key)?.as_object_mut()?;
        }
        current.remove(last)
    }

    /// Remove the value at this path, returning whether anything was removed.
    pub fn unset(&self, body: &mut Map<String, Value>) -> bool {
        self.take(body).is_some()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_valid_paths() {
        assert_eq!(FieldPath::new("title").unwrap().segments(), ["title"]);
        assert_eq!(
            FieldPath::new("archived_at.crg").unwrap().segments(),
            ["archived_at", "crg"]
        );
    }

    #[test]
    fn test_parse_invalid_paths() {
        assert!(FieldPath::new("").is_err());
        assert!(FieldPath::new("a..b").is_err());
        assert!(FieldPath::new(".a").is_err());
        assert!(FieldPath::new("a.$set").is_err());
    }

    #[test]
    fn test_get_nested() {
        let doc = body(json!({"a": {"b": {"c": 3}}, "x": 1}));
        assert_eq!(FieldPath::new("a.b.c").unwrap().get(&doc), Some(&json!(3)));
        assert_eq!(FieldPath::new("x").unwrap().get(&doc), Some(&json!(1)));
        assert_eq!(FieldPath::new("x.y").unwrap().get(&doc), None);
        assert_eq!(FieldPath::new("a.z").unwrap().get(&doc), None);
    }

    #[test]
    fn test_exists_includes_null() {
        let doc = body(json!({"empty": null}));
        assert!(FieldPath::new("empty").unwrap().exists(&doc));
        assert!(!FieldPath::new("missing").unwrap().exists(&doc));
    }

    #[test]
    fn test_set_creates_intermediate_maps() {
        let mut doc = body(json!({"x": 1}));
        FieldPath::new("a.b.c").unwrap().set(&mut doc, json!("deep"));
        assert_eq!(Value::Object(doc), json!({"x": 1, "a": {"b": {"c": "deep"}}}));
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let mut doc = body(json!({"a": 5}));
        FieldPath::new("a.b").unwrap().set(&mut doc, json!(1));
        assert_eq!(Value::Object(doc), json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_take_and_unset() {
        let mut doc = body(json!({"a": {"b": 1, "c": 2}}));
        let path = FieldPath::new("a.b").unwrap();
        assert_eq!(path.take(&mut doc), Some(json!(1)));
        assert!(!path.unset(&mut doc));
        assert_eq!(Value::Object(doc), json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_starts_with() {
        let parent = FieldPath::new("a").unwrap();
        let child = FieldPath::new("a.b").unwrap();
        assert!(child.starts_with(&parent));
        assert!(!parent.starts_with(&child));
        assert!(parent.starts_with(&parent));
    }

    #[test]
    fn test_serde_as_dotted_string() {
        let path = FieldPath::new("a.b").unwrap();
        assert_eq!(serde_json::to_value(&path).unwrap(), json!("a.b"));
        let back: FieldPath = serde_json::from_value(json!("a.b")).unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_value::<FieldPath>(json!("")).is_err());
    }
}
