//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::commands::Commands;

/// Curate document collections with field-level change history.
#[derive(Parser, Debug)]
#[command(name = "docledger")]
#[command(author, version = env!("DOCLEDGER_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand; each overrides the config profile.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config profile (defaults to config.json in the data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root directory of the document store
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Name of the person applying the change
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// How the data was obtained or modified
    #[arg(long, global = true)]
    pub method: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}
