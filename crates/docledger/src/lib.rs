//! docledger - Field-level change history and restore for document stores.
//!
//! Every mutation made through a [`Ledger`] records, inside each changed
//! document, a log entry describing the change, and one audit record per
//! batch. Any logged change can later be undone with
//! [`Ledger::restore_one`] or [`Ledger::restore_all`].
//!
//! # Example
//!
//! ```
//! use docledger::{Ledger, SetMode};
//! use docledger_core::{FieldPath, MemoryStore, Operator, Selector};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let ledger = Ledger::new(MemoryStore::new());
//! let operator = Operator::new("curator", "manual review");
//! let tags = FieldPath::new("tags").unwrap();
//! let key = Selector::eq(FieldPath::new("stable_id").unwrap(), "X");
//!
//! let doc = json!({"stable_id": "X", "tags": ["a", "b"]});
//! ledger
//!     .insert_documents("study", vec![doc.as_object().cloned().unwrap()], &operator)
//!     .await
//!     .unwrap();
//!
//! let first = ledger
//!     .set_one("study", &key, &tags, json!(["b", "c"]), SetMode::Update, &operator)
//!     .await
//!     .unwrap();
//!
//! ledger
//!     .restore_one("study", &key, &first.log_id.unwrap(), &operator)
//!     .await
//!     .unwrap();
//! # }
//! ```

mod command;
mod executor;
mod recorder;
mod restore;
pub mod tracker;

pub use command::Command;
pub use executor::{Ledger, SetMode};
pub use recorder::Recorder;
pub use restore::{RestorePlan, plan_restore, reconstruct};
