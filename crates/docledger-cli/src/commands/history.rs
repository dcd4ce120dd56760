//! Show the change log of one document.

use anyhow::{Context as _, Result};
use chrono::SecondsFormat;
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use docledger_core::FieldState;

use super::selector;
use crate::config::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Collection holding the document
    pub collection: String,

    /// Key of the document
    pub key: String,

    /// Match the key against this field instead of the configured key field
    #[arg(long)]
    pub by: Option<String>,
}

pub async fn run(args: HistoryArgs, ctx: &Context) -> Result<()> {
    let selector = selector(ctx.ledger.settings(), args.by.as_deref(), &args.key)?;
    let entries = ctx
        .ledger
        .history(&args.collection, &selector)
        .await
        .context("Failed to read history")?;

    if ctx.json {
        return output::json_pretty(&entries);
    }

    if entries.is_empty() {
        output::notice("No logged changes");
        return Ok(());
    }

    let recorder = ctx.ledger.recorder();
    for entry in &entries {
        println!("{} {}", entry.log_id.as_str().bold(), entry.operation);

        if let Some(record) = recorder
            .audit_record(&entry.log_id)
            .await
            .context("Failed to read audit record")?
        {
            output::field("By", &format!("{} ({})", record.operator_name, record.method));
            output::field(
                "At",
                &record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }

        if let Some(field) = &entry.modified_field {
            output::field("Field", &field.to_string());
        }
        if let Some(id) = &entry.previous_log_id {
            output::field("Restores", id.as_str());
        }
        if let Some(state) = &entry.previous_value {
            output::field("Previous", &describe(state));
        }
        if let Some(state) = &entry.new_value {
            output::field("New", &describe(state));
        }
        if let Some(state) = &entry.restored_value {
            output::field("Restored", &describe(state));
        }
        if let Some(diff) = &entry.changed_values {
            output::field("Added", &Value::Array(diff.added.clone()).to_string());
            output::field("Removed", &Value::Array(diff.removed.clone()).to_string());
        }
    }

    Ok(())
}

fn describe(state: &FieldState) -> String {
    match state {
        FieldState::Missing => "(missing)".to_string(),
        FieldState::Present(value) => value.to_string(),
    }
}
