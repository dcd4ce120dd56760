//! Per-document change log entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::{FieldPath, FieldState, LogId, deserialize_some_state};

/// The kind of batch that produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Document creation.
    Insert,
    /// Field update on one or all documents.
    Update,
    /// Field update driven by an external table.
    UpdateWithFile,
    /// Field update that creates missing fields.
    Upsert,
    /// Creation of a null field in every document lacking it.
    AddEmptyField,
    /// Field rename.
    Rename,
    /// Field removal.
    Remove,
    /// Restore of an earlier entry.
    Restore,
}

impl Operation {
    /// Whether entries of this kind can be the target of a restore.
    pub fn is_restorable(&self) -> bool {
        matches!(
            self,
            Operation::Update
                | Operation::UpdateWithFile
                | Operation::Remove
                | Operation::Rename
                | Operation::Upsert
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::UpdateWithFile => "update_with_file",
            Operation::Upsert => "upsert",
            Operation::AddEmptyField => "add_empty_field",
            Operation::Rename => "rename",
            Operation::Remove => "remove",
            Operation::Restore => "restore",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Elements added to and removed from a list-valued field by one write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueDiff {
    pub added: Vec<Value>,
    pub removed: Vec<Value>,
}

/// How an entry recorded the state it replaced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recorded<'a> {
    /// The full previous state.
    Snapshot(&'a FieldState),
    /// Only the added/removed elements.
    Diff(&'a ValueDiff),
}

/// One field-level change embedded in a document's `log`.
///
/// For mutation entries exactly one of `previous_value` and
/// `changed_values` is set. Restore entries carry `previous_log_id`,
/// `restored_value` and the `previous_value` they replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub log_id: LogId,

    pub operation: Operation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_field: Option<FieldPath>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_some_state"
    )]
    pub previous_value: Option<FieldState>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_some_state"
    )]
    pub new_value: Option<FieldState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_values: Option<ValueDiff>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_log_id: Option<LogId>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_some_state"
    )]
    pub restored_value: Option<FieldState>,
}

impl LogEntry {
    fn bare(log_id: LogId, operation: Operation, field: Option<FieldPath>) -> Self {
        Self {
            log_id,
            operation,
            modified_field: field,
            previous_value: None,
            new_value: None,
            changed_values: None,
            previous_log_id: None,
            restored_value: None,
        }
    }

    /// Entry stamped on a newly inserted document.
    pub fn insert(log_id: LogId) -> Self {
        Self::bare(log_id, Operation::Insert, None)
    }

    /// Entry holding the full previous state of the field.
    pub fn snapshot(
        log_id: LogId,
        operation: Operation,
        field: FieldPath,
        previous: FieldState,
        new: FieldState,
    ) -> Self {
        Self {
            previous_value: Some(previous),
            new_value: Some(new),
            ..Self::bare(log_id, operation, Some(field))
        }
    }

    /// Entry holding only the elements added and removed.
    pub fn diff(log_id: LogId, operation: Operation, field: FieldPath, diff: ValueDiff) -> Self {
        Self {
            changed_values: Some(diff),
            ..Self::bare(log_id, operation, Some(field))
        }
    }

    /// Rename entry. The value pair holds field names, not field values.
    pub fn rename(log_id: LogId, from: &FieldPath, to: &FieldPath) -> Self {
        Self::snapshot(
            log_id,
            Operation::Rename,
            from.clone(),
            FieldState::Present(Value::String(from.to_string())),
            FieldState::Present(Value::String(to.to_string())),
        )
    }

    /// Entry written by a restore of `target`.
    pub fn restore(
        log_id: LogId,
        field: FieldPath,
        previous: FieldState,
        restored: FieldState,
        target: LogId,
    ) -> Self {
        Self {
            previous_value: Some(previous),
            restored_value: Some(restored),
            previous_log_id: Some(target),
            ..Self::bare(log_id, Operation::Restore, Some(field))
        }
    }

    /// How this entry recorded the replaced state, if it did.
    pub fn recorded(&self) -> Option<Recorded<'_>> {
        match (&self.changed_values, &self.previous_value) {
            (Some(diff), _) => Some(Recorded::Diff(diff)),
            (None, Some(previous)) => Some(Recorded::Snapshot(previous)),
            (None, None) => None,
        }
    }

    /// For rename entries, the old and new field names.
    pub fn renamed_fields(&self) -> Option<(FieldPath, FieldPath)> {
        if self.operation != Operation::Rename {
            return None;
        }
        let from = self.previous_value.as_ref()?.value()?.as_str()?;
        let to = self.new_value.as_ref()?.value()?.as_str()?;
        Some((FieldPath::new(from).ok()?, FieldPath::new(to).ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        FieldPath::new(s).unwrap()
    }

    #[test]
    fn test_snapshot_serialization() {
        let entry = LogEntry::snapshot(
            LogId::new("L1"),
            Operation::Remove,
            path("title"),
            FieldState::Present(json!("old")),
            FieldState::Missing,
        );

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "log_id": "L1",
                "operation": "remove",
                "modified_field": "title",
                "previous_value": "old",
                "new_value": "Non-existing"
            })
        );
    }

    #[test]
    fn test_diff_serialization() {
        let entry = LogEntry::diff(
            LogId::new("L2"),
            Operation::Update,
            path("tags"),
            ValueDiff {
                added: vec![json!("c")],
                removed: vec![json!("a")],
            },
        );

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({
                "log_id": "L2",
                "operation": "update",
                "modified_field": "tags",
                "changed_values": {"added": ["c"], "removed": ["a"]}
            })
        );
        assert!(value.get("previous_value").is_none());
    }

    #[test]
    fn test_null_previous_value_survives_roundtrip() {
        let entry = LogEntry::snapshot(
            LogId::new("L3"),
            Operation::Update,
            path("x"),
            FieldState::Present(Value::Null),
            FieldState::Present(json!(1)),
        );
        let back: LogEntry = serde_json::from_value(serde_json::to_value(&entry).unwrap()).unwrap();
        assert_eq!(back.previous_value, Some(FieldState::Present(Value::Null)));
    }

    #[test]
    fn test_insert_entry_is_minimal() {
        let value = serde_json::to_value(LogEntry::insert(LogId::new("L0"))).unwrap();
        assert_eq!(value, json!({"log_id": "L0", "operation": "insert"}));
    }

    #[test]
    fn test_recorded() {
        let snapshot = LogEntry::snapshot(
            LogId::new("a"),
            Operation::Update,
            path("x"),
            FieldState::Missing,
            FieldState::Present(json!(1)),
        );
        assert!(matches!(snapshot.recorded(), Some(Recorded::Snapshot(FieldState::Missing))));
        assert_eq!(LogEntry::insert(LogId::new("b")).recorded(), None);
    }

    #[test]
    fn test_rename_entry() {
        let entry = LogEntry::rename(LogId::new("r"), &path("old"), &path("new"));
        assert_eq!(entry.modified_field, Some(path("old")));
        assert_eq!(entry.renamed_fields(), Some((path("old"), path("new"))));
    }

    #[test]
    fn test_restorable_kinds() {
        assert!(Operation::Update.is_restorable());
        assert!(Operation::UpdateWithFile.is_restorable());
        assert!(Operation::Upsert.is_restorable());
        assert!(Operation::Rename.is_restorable());
        assert!(Operation::Remove.is_restorable());
        assert!(!Operation::Insert.is_restorable());
        assert!(!Operation::Restore.is_restorable());
        assert!(!Operation::AddEmptyField.is_restorable());
    }
}
