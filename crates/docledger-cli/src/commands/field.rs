//! Commands that change which fields a collection holds.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use tracing::warn;

use docledger::Command;

use super::field_path;

#[derive(Args, Debug)]
pub struct AddEmptyFieldArgs {
    /// Collection to update
    pub collection: String,

    /// Field to add as null where it is missing
    pub field: String,
}

#[derive(Args, Debug)]
pub struct RenameFieldArgs {
    /// Collection to update
    pub collection: String,

    /// Current field name
    pub from: String,

    /// New field name
    pub to: String,
}

#[derive(Args, Debug)]
pub struct RemoveFieldArgs {
    /// Collection to update
    pub collection: String,

    /// Field to remove from every document
    pub field: String,

    /// Skip confirmation prompt
    #[arg(long, short = 'f')]
    pub force: bool,
}

pub fn add_empty(args: AddEmptyFieldArgs) -> Result<Command> {
    Ok(Command::AddEmptyField {
        field: field_path(&args.field)?,
        collection: args.collection,
    })
}

pub fn rename(args: RenameFieldArgs) -> Result<Command> {
    Ok(Command::Rename {
        from: field_path(&args.from)?,
        to: field_path(&args.to)?,
        collection: args.collection,
    })
}

pub fn remove(args: RemoveFieldArgs) -> Result<Command> {
    Ok(Command::Remove {
        field: field_path(&args.field)?,
        collection: args.collection,
    })
}

/// Ask on the terminal; anything but `y` declines.
pub fn confirm_on_stdin(prompt: &str) -> bool {
    eprint!("{} [y/N] ", prompt);
    if let Err(e) = io::stderr().flush() {
        warn!(error = %e, "Failed to flush prompt");
    }

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(_) => input.trim().eq_ignore_ascii_case("y"),
        Err(e) => {
            warn!(error = %e, "Failed to read confirmation");
            false
        }
    }
}
