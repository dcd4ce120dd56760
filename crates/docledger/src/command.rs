//! One value per mutation request.

use serde_json::{Map, Value};

use docledger_core::{
    BatchReport, Confirm, FieldPath, LogId, Operation, Operator, Result, Selector, UpdateTable,
};

use crate::executor::{Ledger, SetMode};

/// A mutation request, ready to run against a [`Ledger`].
#[derive(Debug, Clone)]
pub enum Command {
    Insert {
        collection: String,
        documents: Vec<Map<String, Value>>,
    },
    SetOne {
        collection: String,
        selector: Selector,
        field: FieldPath,
        value: Value,
        mode: SetMode,
    },
    SetAll {
        collection: String,
        field: FieldPath,
        value: Value,
        mode: SetMode,
    },
    SetFromTable {
        collection: String,
        table: UpdateTable,
        mode: SetMode,
        reset_unlisted: bool,
    },
    AddEmptyField {
        collection: String,
        field: FieldPath,
    },
    Rename {
        collection: String,
        from: FieldPath,
        to: FieldPath,
    },
    Remove {
        collection: String,
        field: FieldPath,
    },
    RestoreOne {
        collection: String,
        selector: Selector,
        log_id: LogId,
    },
    RestoreAll {
        collection: String,
        log_id: LogId,
    },
}

impl Command {
    pub fn collection(&self) -> &str {
        match self {
            Command::Insert { collection, .. }
            | Command::SetOne { collection, .. }
            | Command::SetAll { collection, .. }
            | Command::SetFromTable { collection, .. }
            | Command::AddEmptyField { collection, .. }
            | Command::Rename { collection, .. }
            | Command::Remove { collection, .. }
            | Command::RestoreOne { collection, .. }
            | Command::RestoreAll { collection, .. } => collection,
        }
    }

    /// The operation recorded in the audit record.
    pub fn operation(&self) -> Operation {
        match self {
            Command::Insert { .. } => Operation::Insert,
            Command::SetOne { mode, .. } | Command::SetAll { mode, .. } => match mode {
                SetMode::Update => Operation::Update,
                SetMode::Upsert => Operation::Upsert,
            },
            Command::SetFromTable { mode, .. } => match mode {
                SetMode::Update => Operation::UpdateWithFile,
                SetMode::Upsert => Operation::Upsert,
            },
            Command::AddEmptyField { .. } => Operation::AddEmptyField,
            Command::Rename { .. } => Operation::Rename,
            Command::Remove { .. } => Operation::Remove,
            Command::RestoreOne { .. } | Command::RestoreAll { .. } => Operation::Restore,
        }
    }
}

impl Ledger {
    /// Run a command. `confirm` gates destructive commands.
    pub async fn execute(
        &self,
        command: Command,
        operator: &Operator,
        confirm: &dyn Confirm,
    ) -> Result<BatchReport> {
        match command {
            Command::Insert {
                collection,
                documents,
            } => self.insert_documents(&collection, documents, operator).await,
            Command::SetOne {
                collection,
                selector,
                field,
                value,
                mode,
            } => {
                self.set_one(&collection, &selector, &field, value, mode, operator)
                    .await
            }
            Command::SetAll {
                collection,
                field,
                value,
                mode,
            } => self.set_all(&collection, &field, value, mode, operator).await,
            Command::SetFromTable {
                collection,
                table,
                mode,
                reset_unlisted,
            } => {
                self.set_from_table(&collection, &table, mode, reset_unlisted, operator)
                    .await
            }
            Command::AddEmptyField { collection, field } => {
                self.add_empty_field(&collection, &field, operator).await
            }
            Command::Rename {
                collection,
                from,
                to,
            } => self.rename(&collection, &from, &to, operator).await,
            Command::Remove { collection, field } => {
                self.remove(&collection, &field, confirm, operator).await
            }
            Command::RestoreOne {
                collection,
                selector,
                log_id,
            } => {
                self.restore_one(&collection, &selector, &log_id, operator)
                    .await
            }
            Command::RestoreAll { collection, log_id } => {
                self.restore_all(&collection, &log_id, operator).await
            }
        }
    }
}
