//! Subcommand implementations.
//!
//! Mutating subcommands are turned into [`Command`]s by [`to_commands`] and
//! run through the ledger; `history` and `collections` only read.

mod collections;
mod field;
mod history;
mod insert;
mod restore;
mod set;

use anyhow::{Context as _, Result, bail};
use clap::Subcommand;
use tracing::info;

use docledger::{Command, SetMode};
use docledger_core::{AlwaysConfirm, BatchReport, Confirm, FieldPath, LedgerSettings, Selector};

use crate::config::Context;
use crate::output;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Insert documents from a JSON file or directory
    Insert(insert::InsertArgs),

    /// Set an existing field of one document
    UpdateOne(set::SetOneArgs),

    /// Set a field in every document that already has it
    UpdateAll(set::SetAllArgs),

    /// Set existing fields from a CSV table (match field, target field)
    UpdateWithFile(set::SetFromFileArgs),

    /// Set a field of one document, creating it if needed
    UpsertOne(set::SetOneArgs),

    /// Set a field in every document, creating it if needed
    UpsertAll(set::SetAllArgs),

    /// Set fields from a CSV table, creating them if needed
    UpsertWithFile(set::SetFromFileArgs),

    /// Add a field as null to every document missing it
    AddEmptyField(field::AddEmptyFieldArgs),

    /// Rename a field in every document
    RenameField(field::RenameFieldArgs),

    /// Remove a field from every document
    RemoveField(field::RemoveFieldArgs),

    /// Undo a logged change in one document
    RestoreOne(restore::RestoreOneArgs),

    /// Undo a logged change in every document that carries it
    RestoreAll(restore::RestoreAllArgs),

    /// Show the change log of one document
    History(history::HistoryArgs),

    /// List collections in the store
    Collections,
}

pub async fn handle(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::History(args) => history::run(args, ctx).await,
        Commands::Collections => collections::run(ctx).await,
        Commands::RemoveField(args) if !args.force => {
            run_batches(ctx, vec![field::remove(args)?], &field::confirm_on_stdin).await
        }
        command => {
            let commands = to_commands(command, ctx.ledger.settings())?;
            run_batches(ctx, commands, &AlwaysConfirm).await
        }
    }
}

/// Map a mutating subcommand to the commands it runs, one per input file.
pub fn to_commands(command: Commands, settings: &LedgerSettings) -> Result<Vec<Command>> {
    let commands = match command {
        Commands::Insert(args) => insert::commands(args)?,
        Commands::UpdateOne(args) => vec![set::one(args, SetMode::Update, settings)?],
        Commands::UpdateAll(args) => vec![set::all(args, SetMode::Update, settings)?],
        Commands::UpdateWithFile(args) => set::from_files(args, SetMode::Update, settings)?,
        Commands::UpsertOne(args) => vec![set::one(args, SetMode::Upsert, settings)?],
        Commands::UpsertAll(args) => vec![set::all(args, SetMode::Upsert, settings)?],
        Commands::UpsertWithFile(args) => set::from_files(args, SetMode::Upsert, settings)?,
        Commands::AddEmptyField(args) => vec![field::add_empty(args)?],
        Commands::RenameField(args) => vec![field::rename(args)?],
        Commands::RemoveField(args) => vec![field::remove(args)?],
        Commands::RestoreOne(args) => vec![restore::one(args, settings)?],
        Commands::RestoreAll(args) => vec![restore::all(args)],
        Commands::History(_) | Commands::Collections => {
            bail!("This subcommand does not modify documents")
        }
    };

    Ok(commands)
}

/// Run commands in order and print their combined report.
async fn run_batches(ctx: &Context, commands: Vec<Command>, confirm: &dyn Confirm) -> Result<()> {
    let operator = ctx.operator()?;

    let mut reports = Vec::with_capacity(commands.len());
    for command in commands {
        let collection = command.collection().to_string();
        let operation = command.operation();

        let report = ctx
            .ledger
            .execute(command, &operator, confirm)
            .await
            .with_context(|| format!("{} on '{}' failed", operation, collection))?;

        info!(
            %collection,
            %operation,
            modified = report.modified,
            outcome = ?report.outcome,
            "Batch finished"
        );
        reports.push(report);
    }

    output::report(&BatchReport::merge(reports), ctx.json)
}

fn field_path(s: &str) -> Result<FieldPath> {
    FieldPath::new(s).with_context(|| format!("Invalid field path '{}'", s))
}

/// Select a document by `key`, matched against `by` or the configured key field.
fn selector(settings: &LedgerSettings, by: Option<&str>, key: &str) -> Result<Selector> {
    let field = field_path(by.unwrap_or(&settings.key_field))?;
    Ok(Selector::eq(field, key))
}
