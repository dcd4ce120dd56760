//! Settings shared by the engine and its front ends.

use serde::{Deserialize, Serialize};

/// Names and limits used by every batch.
///
/// Each field falls back to its default when absent from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Field holding the stable business key of a document.
    pub key_field: String,

    /// Field holding the embedded change log.
    pub log_field: String,

    /// Collection holding one audit record per batch.
    pub audit_collection: String,

    /// Collection holding the tables used by table-driven batches.
    pub provenance_collection: String,

    /// Maximum per-document writes (and provenance rows) per store round trip.
    pub chunk_size: usize,

    /// Separator that turns a raw input value into a list.
    pub list_separator: char,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            key_field: "stable_id".to_string(),
            log_field: "log".to_string(),
            audit_collection: "log_details".to_string(),
            provenance_collection: "update_files".to_string(),
            chunk_size: 10_000,
            list_separator: ';',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings: LedgerSettings =
            serde_json::from_str(r#"{"key_field": "accession", "chunk_size": 50}"#).unwrap();

        assert_eq!(settings.key_field, "accession");
        assert_eq!(settings.chunk_size, 50);
        assert_eq!(settings.log_field, "log");
        assert_eq!(settings.list_separator, ';');
    }
}
