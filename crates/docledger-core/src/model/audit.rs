//! Batch-level audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Operation;
use crate::types::LogId;

/// Who ran a batch and how the data was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Name of the person applying the change.
    pub name: String,
    /// Method used to obtain or modify the data (e.g. "Raw data EGAPRO").
    pub method: String,
}

impl Operator {
    pub fn new(name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: method.into(),
        }
    }
}

/// One record per logical batch, stored in the audit collection.
///
/// The record's store id is the batch's [`LogId`]; it is only kept while at
/// least one document carries a log entry with that id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LogId>,
    pub operator_name: String,
    pub operation: Operation,
    pub collection: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    /// A new, not yet stored, record stamped with the current time.
    pub fn new(operator: &Operator, operation: Operation, collection: &str) -> Self {
        Self {
            id: None,
            operator_name: operator.name.clone(),
            operation,
            collection: collection.to_string(),
            method: operator.method.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Parse a record read back from the audit collection.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_fields() {
        let operator = Operator::new("Marta", "Raw data EGAPRO");
        let record = AuditRecord::new(&operator, Operation::Update, "study");

        assert_eq!(record.operator_name, "Marta");
        assert_eq!(record.method, "Raw data EGAPRO");
        assert_eq!(record.collection, "study");
        assert!(record.id.is_none());

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("_id").is_none());
        assert_eq!(value["operation"], "update");
    }

    #[test]
    fn test_roundtrip_with_id() {
        let operator = Operator::new("a", "b");
        let mut record = AuditRecord::new(&operator, Operation::Restore, "run");
        record.id = Some(LogId::new("abc"));

        let back = AuditRecord::from_value(serde_json::to_value(&record).unwrap()).unwrap();
        assert_eq!(back, record);
    }
}
