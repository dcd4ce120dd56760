//! Core docledger types.
//!
//! These types enforce their invariants at construction time, so field
//! paths and identifiers are validated once at the boundary.

mod ids;
mod path;
mod state;

pub use ids::{DocumentId, LogId};
pub use path::FieldPath;
pub use state::{FieldState, NON_EXISTING, deserialize_some_state};
