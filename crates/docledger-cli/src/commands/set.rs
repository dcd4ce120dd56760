//! Set a field from the command line or from update tables.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use docledger::{Command, SetMode};
use docledger_core::LedgerSettings;
use docledger_core::model::parse_input_value;

use super::{field_path, selector};
use crate::input;

#[derive(Args, Debug)]
pub struct SetOneArgs {
    /// Collection holding the document
    pub collection: String,

    /// Key of the document
    pub key: String,

    /// Field to set (dotted path)
    pub field: String,

    /// New value; text containing the list separator becomes a list
    pub value: String,

    /// Match the key against this field instead of the configured key field
    #[arg(long)]
    pub by: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetAllArgs {
    /// Collection to update
    pub collection: String,

    /// Field to set (dotted path)
    pub field: String,

    /// New value; text containing the list separator becomes a list
    pub value: String,
}

#[derive(Args, Debug)]
pub struct SetFromFileArgs {
    /// Collection to update
    pub collection: String,

    /// CSV file, or a directory of CSV files processed in natural order
    pub path: PathBuf,

    /// Set the field to null in documents the table does not list
    #[arg(long)]
    pub reset_unlisted: bool,
}

pub fn one(args: SetOneArgs, mode: SetMode, settings: &LedgerSettings) -> Result<Command> {
    Ok(Command::SetOne {
        selector: selector(settings, args.by.as_deref(), &args.key)?,
        field: field_path(&args.field)?,
        value: parse_input_value(&args.value, settings.list_separator),
        collection: args.collection,
        mode,
    })
}

pub fn all(args: SetAllArgs, mode: SetMode, settings: &LedgerSettings) -> Result<Command> {
    Ok(Command::SetAll {
        field: field_path(&args.field)?,
        value: parse_input_value(&args.value, settings.list_separator),
        collection: args.collection,
        mode,
    })
}

/// One command per table file.
pub fn from_files(
    args: SetFromFileArgs,
    mode: SetMode,
    settings: &LedgerSettings,
) -> Result<Vec<Command>> {
    let files = input::input_files(&args.path, &["csv"])?;
    if files.is_empty() {
        bail!("No .csv files found in {}", args.path.display());
    }

    files
        .iter()
        .map(|file| -> Result<Command> {
            Ok(Command::SetFromTable {
                collection: args.collection.clone(),
                table: input::read_table(file, settings.list_separator)?,
                mode,
                reset_unlisted: args.reset_unlisted,
            })
        })
        .collect()
}
