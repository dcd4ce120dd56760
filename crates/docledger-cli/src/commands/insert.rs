//! Insert command implementation.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use docledger::Command;

use crate::input;

#[derive(Args, Debug)]
pub struct InsertArgs {
    /// Collection to insert into
    pub collection: String,

    /// JSON file, or a directory of JSON files processed in natural order
    pub path: PathBuf,
}

/// One command per JSON file.
pub fn commands(args: InsertArgs) -> Result<Vec<Command>> {
    let files = input::input_files(&args.path, &["json"])?;
    if files.is_empty() {
        bail!("No .json files found in {}", args.path.display());
    }

    files
        .iter()
        .map(|file| -> Result<Command> {
            Ok(Command::Insert {
                collection: args.collection.clone(),
                documents: input::read_documents(file)?,
            })
        })
        .collect()
}
