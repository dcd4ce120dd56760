//! External update tables.

use serde_json::{Map, Value};

use super::Operation;
use crate::error::{Error, InvalidInputError};
use crate::types::{FieldPath, LogId};

/// Cell texts read as the absent-value sentinel (`null`).
const ABSENT_CELLS: [&str; 4] = ["", "NaN", "nan", "None"];

/// Convert raw text input into a field value.
///
/// Text containing `separator` becomes a list of its parts; anything else
/// stays a string.
///
/// ```
/// use docledger_core::model::parse_input_value;
/// use serde_json::json;
///
/// assert_eq!(parse_input_value("a;b", ';'), json!(["a", "b"]));
/// assert_eq!(parse_input_value("a", ';'), json!("a"));
/// ```
pub fn parse_input_value(raw: &str, separator: char) -> Value {
    if raw.contains(separator) {
        Value::Array(
            raw.split(separator)
                .map(|part| Value::String(part.to_string()))
                .collect(),
        )
    } else {
        Value::String(raw.to_string())
    }
}

/// Convert a table cell into a field value; empty and `NaN` cells become null.
pub fn parse_cell_value(raw: &str, separator: char) -> Value {
    if ABSENT_CELLS.contains(&raw.trim()) {
        Value::Null
    } else {
        parse_input_value(raw, separator)
    }
}

/// One row of an update table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Value of the match field identifying the document.
    pub key: Value,
    /// New value for the target field.
    pub value: Value,
}

/// A two-column update table: match field, then target field.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTable {
    pub match_field: FieldPath,
    pub target_field: FieldPath,
    pub rows: Vec<TableRow>,
}

impl UpdateTable {
    /// Build a table from a header row and text records.
    ///
    /// Only the first two columns are used. Keys are kept as text; values go
    /// through [`parse_cell_value`].
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than two headers, a header is not a
    /// valid field path, or a record has fewer than two cells.
    pub fn from_text<H, R>(headers: &[H], records: &[R], separator: char) -> Result<Self, Error>
    where
        H: AsRef<str>,
        R: AsRef<[String]>,
    {
        if headers.len() < 2 {
            return Err(InvalidInputError::Table {
                reason: format!("expected at least 2 columns, found {}", headers.len()),
            }
            .into());
        }

        let match_field = FieldPath::new(headers[0].as_ref().trim())?;
        let target_field = FieldPath::new(headers[1].as_ref().trim())?;

        let rows = records
            .iter()
            .enumerate()
            .map(|(index, record)| match record.as_ref() {
                [key, value, ..] => Ok(TableRow {
                    key: Value::String(key.trim().to_string()),
                    value: parse_cell_value(value, separator),
                }),
                _ => Err(InvalidInputError::Table {
                    reason: format!("row {} has fewer than 2 cells", index + 1),
                }
                .into()),
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Self {
            match_field,
            target_field,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Split the table into provenance bodies of at most `chunk_size` rows.
    ///
    /// Each body holds the batch's `log_id`, the operation, and one array per
    /// column keyed by the column's field name.
    pub fn provenance_chunks(
        &self,
        log_id: &LogId,
        operation: Operation,
        chunk_size: usize,
    ) -> Vec<Map<String, Value>> {
        self.rows
            .chunks(chunk_size.max(1))
            .map(|chunk| {
                let mut body = Map::new();
                body.insert("log_id".to_string(), Value::String(log_id.to_string()));
                body.insert(
                    "operation".to_string(),
                    Value::String(operation.as_str().to_string()),
                );
                body.insert(
                    self.match_field.to_string(),
                    Value::Array(chunk.iter().map(|row| row.key.clone()).collect()),
                );
                body.insert(
                    self.target_field.to_string(),
                    Value::Array(chunk.iter().map(|row| row.value.clone()).collect()),
                );
                body
            })
            .collect()
    }
}
