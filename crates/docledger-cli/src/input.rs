//! Reading documents and update tables from disk.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use docledger_core::UpdateTable;

/// Resolve a file or directory argument into the files to process.
///
/// Directory entries come back in natural order (`f2` before `f10`); files
/// without one of `extensions` are skipped with a warning.
pub fn input_files(path: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if !has_extension(path, extensions) {
            bail!(
                "{} is not a .{} file",
                path.display(),
                extensions.join(" or .")
            );
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = fs::read_dir(path)
        .with_context(|| format!("Failed to read input directory {}", path.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let file = entry?.path();
        if !file.is_file() {
            continue;
        }
        if has_extension(&file, extensions) {
            files.push(file);
        } else {
            warn!(file = %file.display(), "Skipping file with unsupported extension");
        }
    }

    files.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    debug!(count = files.len(), dir = %path.display(), "Collected input files");

    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Compare names so that embedded numbers sort by value, ignoring case.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (mut a, mut b) = (chunks(a), chunks(b));
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (is_number(x), is_number(y)) {
                    (true, true) => {
                        let (x, y) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
                        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
                    }
                    _ => x.to_lowercase().cmp(&y.to_lowercase()),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn is_number(chunk: &str) -> bool {
    chunk.starts_with(|c: char| c.is_ascii_digit())
}

/// Split into alternating runs of digits and non-digits.
fn chunks(s: &str) -> impl Iterator<Item = &str> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// Read documents from a JSON file holding one object or an array of them.
pub fn read_documents(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&json).with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let items = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| -> Result<Map<String, Value>> {
            match item {
                Value::Object(body) => Ok(body),
                _ => bail!(
                    "Item {} of {} is not a JSON object",
                    index + 1,
                    path.display()
                ),
            }
        })
        .collect()
}

/// Read a two-column update table from a CSV file with a header row.
pub fn read_table(path: &Path, separator: char) -> Result<UpdateTable> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let records = reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect::<Vec<_>>())
                .with_context(|| format!("Malformed row in {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    UpdateTable::from_text(&headers, &records, separator)
        .with_context(|| format!("Invalid update table {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_natural_order() {
        let mut names = vec!["batch10.csv", "batch2.csv", "Batch1.csv", "batch02b.csv"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["Batch1.csv", "batch2.csv", "batch02b.csv", "batch10.csv"]);
    }

    #[test]
    fn test_directory_skips_other_files() {
        let tmp = TempDir::new().unwrap();
        for name in ["u10.csv", "u9.csv", "notes.txt"] {
            fs::write(tmp.path().join(name), "stable_id,title\n").unwrap();
        }
        fs::create_dir(tmp.path().join("nested.csv")).unwrap();

        let files = input_files(tmp.path(), &["csv"]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["u9.csv", "u10.csv"]);
    }

    #[test]
    fn test_single_file_needs_matching_extension() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("table.txt");
        fs::write(&file, "").unwrap();

        assert!(input_files(&file, &["csv"]).is_err());
    }

    #[test]
    fn test_read_documents_object_or_array() {
        let tmp = TempDir::new().unwrap();
        let one = tmp.path().join("one.json");
        let many = tmp.path().join("many.json");
        fs::write(&one, r#"{"stable_id": "A"}"#).unwrap();
        fs::write(&many, r#"[{"stable_id": "A"}, {"stable_id": "B"}]"#).unwrap();

        assert_eq!(read_documents(&one).unwrap().len(), 1);
        let docs = read_documents(&many).unwrap();
        assert_eq!(docs[1]["stable_id"], json!("B"));

        fs::write(&many, r#"[{"stable_id": "A"}, 3]"#).unwrap();
        assert!(read_documents(&many).is_err());
    }

    #[test]
    fn test_read_table() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("update.csv");
        fs::write(&file, "stable_id,files\nS1,a;b\nS2,NaN\nS3,\n").unwrap();

        let table = read_table(&file, ';').unwrap();
        assert_eq!(table.target_field.to_string(), "files");
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].value, json!(["a", "b"]));
        assert_eq!(table.rows[1].value, Value::Null);
        assert_eq!(table.rows[2].value, Value::Null);
    }
}
