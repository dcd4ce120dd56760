//! Restoring fields to the state before a logged change.
//!
//! Snapshot entries hold the replaced value and restore directly. Diff
//! entries only hold what was added and removed, so the value is rebuilt by
//! walking back from the live value through every newer change of the same
//! field, then across the target's own diff.

use tracing::{debug, instrument, warn};

use docledger_core::error::NotFoundError;
use docledger_core::{
    BatchReport, Document, DocumentOutcome, DocumentStatus, Error, FieldPath, FieldState,
    LogEntry, LogId, Operation, Operator, Recorded, Result, Selector,
};

use crate::executor::{Edit, Ledger, Planned, VALUE_UNCHANGED};
use crate::tracker;

/// What restoring one entry does to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum RestorePlan {
    /// Write `restored` back into `field`.
    Value { field: FieldPath, restored: FieldState },
    /// Rename the field `from` back to `to`.
    Rename { from: FieldPath, to: FieldPath },
}

/// A document either gets a restore write or is skipped with a status.
enum Prepared {
    Write(Planned),
    Skip(DocumentStatus),
}

fn not_restorable(log_id: &LogId, reason: impl Into<String>) -> Error {
    Error::NotRestorable {
        log_id: log_id.to_string(),
        reason: reason.into(),
    }
}

fn overlaps(a: &FieldPath, b: &FieldPath) -> bool {
    a.starts_with(b) || b.starts_with(a)
}

/// Whether `entry` moved `field` (or a field containing or inside it) to
/// another name.
fn renames(entry: &LogEntry, log: &[LogEntry], field: &FieldPath) -> bool {
    match entry.operation {
        Operation::Rename => match entry.renamed_fields() {
            Some((from, to)) => overlaps(&from, field) || overlaps(&to, field),
            None => entry.modified_field.as_ref().is_some_and(|m| overlaps(m, field)),
        },
        Operation::Restore => {
            let undid_rename = entry.previous_log_id.as_ref().is_some_and(|target| {
                log.iter()
                    .any(|e| &e.log_id == target && e.operation == Operation::Rename)
            });
            undid_rename && entry.modified_field.as_ref().is_some_and(|m| overlaps(m, field))
        }
        _ => false,
    }
}

/// Work out how to restore the entry `log_id` of a document.
///
/// `log` is the document's log, newest first; `current` is the live state
/// of the entry's field.
///
/// # Errors
///
/// `NotFound` if the log has no such entry; `NotRestorable` if the entry's
/// kind cannot be restored or the field was renamed since.
pub fn plan_restore(
    key: &str,
    log: &[LogEntry],
    log_id: &LogId,
    current: impl Fn(&FieldPath) -> FieldState,
) -> Result<RestorePlan> {
    let Some(position) = log.iter().position(|entry| &entry.log_id == log_id) else {
        return Err(NotFoundError::LogEntry {
            log_id: log_id.to_string(),
            document: key.to_string(),
        }
        .into());
    };
    let target = &log[position];
    let newer = &log[..position];

    if !target.operation.is_restorable() {
        return Err(not_restorable(
            log_id,
            format!("{} entries cannot be restored", target.operation),
        ));
    }

    if target.operation == Operation::Rename {
        let Some((from, to)) = target.renamed_fields() else {
            return Err(not_restorable(log_id, "rename entry does not name its fields"));
        };
        if let Some(later) = newer
            .iter()
            .find(|e| renames(e, log, &to) || renames(e, log, &from))
        {
            return Err(not_restorable(
                log_id,
                format!("field '{}' was renamed again in {}", to, later.log_id),
            ));
        }
        return Ok(RestorePlan::Rename { from: to, to: from });
    }

    let Some(field) = target.modified_field.clone() else {
        return Err(not_restorable(log_id, "entry names no field"));
    };

    for entry in newer {
        if renames(entry, log, &field) {
            return Err(not_restorable(
                log_id,
                format!("field '{}' was renamed afterwards in {}", field, entry.log_id),
            ));
        }
        if let Some(modified) = &entry.modified_field {
            if modified != &field && overlaps(modified, &field) {
                return Err(not_restorable(
                    log_id,
                    format!("field '{}' was changed through '{}' afterwards", field, modified),
                ));
            }
        }
    }

    let restored = match target.recorded() {
        Some(Recorded::Snapshot(previous)) => previous.clone(),
        Some(Recorded::Diff(_)) => reconstruct(&field, current(&field), newer, target),
        None => return Err(not_restorable(log_id, "entry recorded no previous state")),
    };

    Ok(RestorePlan::Value { field, restored })
}

/// Rebuild the value `field` had before `target`, starting from `current`
/// and stepping back through `newer` (newest first).
pub fn reconstruct(
    field: &FieldPath,
    current: FieldState,
    newer: &[LogEntry],
    target: &LogEntry,
) -> FieldState {
    let mut sequence = tracker::as_sequence(current.value());

    for entry in newer.iter().chain(std::iter::once(target)) {
        if entry.modified_field.as_ref() != Some(field) {
            continue;
        }
        match entry.recorded() {
            Some(Recorded::Diff(diff)) => sequence = tracker::undo(sequence, diff),
            Some(Recorded::Snapshot(previous)) => {
                sequence = tracker::as_sequence(previous.value());
            }
            None => {}
        }
    }

    FieldState::Present(tracker::from_sequence(sequence))
}

impl Ledger {
    /// Log of the first document matching `selector`, newest first.
    pub async fn history(&self, collection: &str, selector: &Selector) -> Result<Vec<LogEntry>> {
        let document = self.find_document(collection, selector).await?;
        document.log(&self.settings().log_field)
    }

    /// Turn a restore plan into a planned write, or a reason to skip it.
    fn prepare_restore(&self, document: Document, target: &LogId) -> Result<Prepared> {
        let key = self.key_of(&document);
        let log = document.log(&self.settings().log_field)?;
        let plan = plan_restore(&key, &log, target, |field| document.state(field))?;

        let edit = match plan {
            RestorePlan::Value { field, restored } => {
                self.check_target(&field)?;
                if document.state(&field) == restored {
                    return Ok(Prepared::Skip(DocumentStatus::Skipped(
                        VALUE_UNCHANGED.to_string(),
                    )));
                }
                Edit::Restore {
                    field,
                    restored,
                    target: target.clone(),
                }
            }
            RestorePlan::Rename { from, to } => {
                if !from.exists(document.body()) {
                    return Err(Error::field_absent_in(
                        from.to_string(),
                        format!("document {}", key),
                    ));
                }
                if to.exists(document.body()) {
                    return Err(not_restorable(
                        target,
                        format!("field '{}' already exists", to),
                    ));
                }
                Edit::RenameBack {
                    from,
                    to,
                    target: target.clone(),
                }
            }
        };

        Ok(Prepared::Write(Planned { document, edit }))
    }

    /// Restore the first document matching `selector` to its state before
    /// the entry `log_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no document matches or it has no such entry,
    /// `NotRestorable` if the entry cannot be restored. Neither leaves an
    /// audit record behind.
    #[instrument(skip_all, fields(%collection, %selector, %log_id))]
    pub async fn restore_one(
        &self,
        collection: &str,
        selector: &Selector,
        log_id: &LogId,
        operator: &Operator,
    ) -> Result<BatchReport> {
        let document = self.find_document(collection, selector).await?;
        let key = self.key_of(&document);

        match self.prepare_restore(document, log_id)? {
            Prepared::Write(planned) => {
                self.commit(collection, operator, Operation::Restore, vec![planned], Vec::new(), None)
                    .await
            }
            Prepared::Skip(status) => {
                debug!(%key, ?status, "Nothing to restore");
                Ok(BatchReport::no_change(vec![DocumentOutcome::new(key, status)]))
            }
        }
    }

    /// Restore every document carrying the entry `log_id`.
    ///
    /// Documents that cannot be restored are reported and skipped; the
    /// others are still written. If every document was rejected as not
    /// restorable, that error is returned instead.
    #[instrument(skip_all, fields(%collection, %log_id))]
    pub async fn restore_all(
        &self,
        collection: &str,
        log_id: &LogId,
        operator: &Operator,
    ) -> Result<BatchReport> {
        let selector = Selector::HasLogEntry {
            log_field: self.settings().log_field.clone(),
            log_id: log_id.clone(),
        };
        let documents = self.store().find_many(collection, &selector).await?;

        let mut outcomes = Vec::new();
        let mut plans = Vec::new();
        let mut rejected = Vec::new();

        for document in documents {
            let key = self.key_of(&document);
            match self.prepare_restore(document, log_id) {
                Ok(Prepared::Write(planned)) => plans.push(planned),
                Ok(Prepared::Skip(status)) => outcomes.push(DocumentOutcome::new(key, status)),
                Err(e @ Error::FieldAbsent { .. }) => {
                    warn!(%key, error = %e, "Cannot restore document");
                    outcomes.push(DocumentOutcome::new(key, DocumentStatus::FieldAbsent));
                }
                Err(e) => {
                    warn!(%key, error = %e, "Cannot restore document");
                    outcomes.push(DocumentOutcome::new(key, DocumentStatus::Skipped(e.to_string())));
                    if matches!(e, Error::NotRestorable { .. }) {
                        rejected.push(e);
                    }
                }
            }
        }

        if plans.is_empty() && !rejected.is_empty() && rejected.len() == outcomes.len() {
            return Err(rejected.remove(0));
        }

        self.commit(collection, operator, Operation::Restore, plans, outcomes, None)
            .await
    }
}
