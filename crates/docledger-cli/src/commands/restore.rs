//! Restore commands.

use anyhow::Result;
use clap::Args;

use docledger::Command;
use docledger_core::{LedgerSettings, LogId};

use super::selector;

#[derive(Args, Debug)]
pub struct RestoreOneArgs {
    /// Collection holding the document
    pub collection: String,

    /// Key of the document
    pub key: String,

    /// Log id of the change to undo
    pub log_id: String,

    /// Match the key against this field instead of the configured key field
    #[arg(long)]
    pub by: Option<String>,
}

#[derive(Args, Debug)]
pub struct RestoreAllArgs {
    /// Collection to restore
    pub collection: String,

    /// Log id of the change to undo in every document that carries it
    pub log_id: String,
}

pub fn one(args: RestoreOneArgs, settings: &LedgerSettings) -> Result<Command> {
    Ok(Command::RestoreOne {
        selector: selector(settings, args.by.as_deref(), &args.key)?,
        log_id: LogId::new(args.log_id),
        collection: args.collection,
    })
}

pub fn all(args: RestoreAllArgs) -> Command {
    Command::RestoreAll {
        log_id: LogId::new(args.log_id),
        collection: args.collection,
    }
}
