//! Chooses how a field write is recorded and computes list diffs.
//!
//! Scalar fields keep a full snapshot of the value they replace. List
//! fields keep only the elements added and removed, so a long history of
//! small edits to a large list stays small. A field's first write (or its
//! removal) is always a snapshot.

use serde_json::Value;

use docledger_core::{FieldState, ValueDiff};

/// How one write is recorded in the log.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The full previous and new states.
    Snapshot { previous: FieldState, new: FieldState },
    /// Elements added and removed.
    Diff(ValueDiff),
}

/// Normalize a value into an ordered sequence.
///
/// Absent and `null` become empty, a scalar becomes a one-element sequence.
pub fn as_sequence(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// Turn a sequence back into a field value.
///
/// An empty sequence is `null` and a single element collapses to a scalar.
pub fn from_sequence(mut sequence: Vec<Value>) -> Value {
    match sequence.len() {
        0 => Value::Null,
        1 => sequence.remove(0),
        _ => Value::Array(sequence),
    }
}

/// Elements of `left` not in `right`, without duplicates, in `left` order.
fn difference(left: &[Value], right: &[Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in left {
        if !right.contains(item) && !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Set difference between two sequences.
pub fn diff(previous: &[Value], new: &[Value]) -> ValueDiff {
    ValueDiff {
        added: difference(new, previous),
        removed: difference(previous, new),
    }
}

/// Decide how a write from `previous` to `new` is recorded.
pub fn track(previous: &FieldState, new: &FieldState) -> Change {
    if previous.is_missing() || new.is_missing() || !(previous.is_list() || new.is_list()) {
        return Change::Snapshot {
            previous: previous.clone(),
            new: new.clone(),
        };
    }

    Change::Diff(diff(
        &as_sequence(previous.value()),
        &as_sequence(new.value()),
    ))
}

/// Step a sequence back across one recorded diff.
///
/// Added elements are dropped and removed ones re-appended, keeping the
/// order of the elements that stay.
pub fn undo(sequence: Vec<Value>, diff: &ValueDiff) -> Vec<Value> {
    let mut out: Vec<Value> = sequence
        .into_iter()
        .filter(|item| !diff.added.contains(item))
        .collect();

    for item in &diff.removed {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
