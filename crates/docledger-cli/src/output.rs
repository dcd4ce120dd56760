//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use docledger_core::{BatchReport, DocumentStatus, Outcome};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a message about something that did not happen.
pub fn notice(msg: &str) {
    println!("{} {}", "•".yellow(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a batch report: documents that were not modified, then the summary.
pub fn report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        return json_pretty(report);
    }

    for doc in &report.documents {
        match &doc.status {
            DocumentStatus::Modified => {}
            DocumentStatus::Failed(reason) => error(&format!("{}: {}", doc.key, reason)),
            status => field(&doc.key, &describe(status)),
        }
    }

    match report.outcome {
        Outcome::Modified => {
            success(&format!("{} document(s) modified", report.modified));
            if let Some(log_id) = &report.log_id {
                field("Log id", log_id.as_str());
            }
        }
        Outcome::NoChange => notice("No document modified"),
        Outcome::Cancelled => notice("Cancelled"),
    }

    Ok(())
}

fn describe(status: &DocumentStatus) -> String {
    match status {
        DocumentStatus::Modified => "modified".to_string(),
        DocumentStatus::Unchanged => "unchanged".to_string(),
        DocumentStatus::NotFound => "not found".to_string(),
        DocumentStatus::FieldAbsent => "field absent".to_string(),
        DocumentStatus::Skipped(reason) => format!("skipped ({})", reason),
        DocumentStatus::Failed(reason) => format!("failed ({})", reason),
    }
}
