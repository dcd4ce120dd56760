//! Config profile and the per-invocation context built from it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use docledger::Ledger;
use docledger_core::{LedgerSettings, Operator};
use docledger_file::FileStore;

use crate::cli::GlobalArgs;

/// Stored defaults, read from a JSON file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Root directory of the document store.
    pub store: Option<PathBuf>,
    /// Operator name recorded in audit records.
    pub name: Option<String>,
    /// Operator method recorded in audit records.
    pub method: Option<String>,
    pub settings: LedgerSettings,
}

impl Profile {
    /// Load a profile, or `None` if the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let profile = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(Some(profile))
    }
}

/// Get the platform data directory.
fn data_dir() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("", "", "docledger").context("Could not determine data directory")?;

    Ok(dirs.data_dir().to_path_buf())
}

/// Everything a subcommand needs: the ledger, who is operating, how to print.
pub struct Context {
    pub ledger: Ledger,
    pub json: bool,
    name: Option<String>,
    method: Option<String>,
}

impl Context {
    /// Merge command-line flags over the config profile.
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        let profile = match &args.config {
            Some(path) => Profile::load(path)?
                .with_context(|| format!("Config file {} not found", path.display()))?,
            None => Profile::load(&data_dir()?.join("config.json"))?.unwrap_or_default(),
        };

        let store = match args.store.clone().or(profile.store) {
            Some(path) => path,
            None => data_dir()?.join("store"),
        };
        tracing::debug!(store = %store.display(), "Using document store");

        let ledger = Ledger::new(FileStore::new(&store)).with_settings(profile.settings);

        Ok(Self {
            ledger,
            json: args.json,
            name: args.name.clone().or(profile.name),
            method: args.method.clone().or(profile.method),
        })
    }

    /// The operator recorded in audit records. Mutations need both parts.
    pub fn operator(&self) -> Result<Operator> {
        let name = non_blank(&self.name).context(
            "Operator name not set. Pass --name or set \"name\" in the config profile.",
        )?;
        let method = non_blank(&self.method).context(
            "Operator method not set. Pass --method or set \"method\" in the config profile.",
        )?;

        Ok(Operator::new(name, method))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
