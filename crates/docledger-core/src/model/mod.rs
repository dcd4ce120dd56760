//! Versioning and audit model.
//!
//! Documents embed a `log` of [`LogEntry`] values, newest first. Every entry
//! references the [`AuditRecord`] of the batch that wrote it.

mod audit;
mod log;
mod report;
mod table;

pub use audit::{AuditRecord, Operator};
pub use log::{LogEntry, Operation, Recorded, ValueDiff};
pub use report::{BatchReport, DocumentOutcome, DocumentStatus, Outcome};
pub use table::{TableRow, UpdateTable, parse_cell_value, parse_input_value};
