//! List collections in the store.

use anyhow::{Context as _, Result};

use crate::config::Context;
use crate::output;

pub async fn run(ctx: &Context) -> Result<()> {
    let names = ctx
        .ledger
        .store()
        .list_collection_names()
        .await
        .context("Failed to list collections")?;

    if ctx.json {
        return output::json_pretty(&names);
    }

    for name in &names {
        println!("{}", name);
    }

    Ok(())
}
