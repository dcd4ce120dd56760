//! Core traits for store and confirmation behavior.

mod confirm;
mod store;

pub use confirm::{AlwaysConfirm, Confirm};
pub use store::{BulkWriteResult, DocumentStore, WriteFailure, WriteResult};
