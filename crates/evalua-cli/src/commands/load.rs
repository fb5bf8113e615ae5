//! The `evalua load` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use evalua_core::parser;

use super::Session;

pub async fn execute(
    catalog_path: PathBuf,
    state: Option<PathBuf>,
    as_user: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let catalog = parser::parse_catalog(&catalog_path)?;
    for w in parser::validate_catalog(&catalog) {
        let subject = w.subject.unwrap_or_default();
        eprintln!("Warning: [{subject}] {}", w.message);
    }

    let session = Session::open(state, config_path.as_deref())?;
    let ctx = match &as_user {
        Some(username) => session.act_as(username).await?,
        None => session
            .assessment
            .bootstrap(&catalog)
            .await
            .context("cannot bootstrap the state; pass --as <admin> to import into an existing state")?,
    };

    let summary = session
        .assessment
        .import_catalog(&ctx, &catalog)
        .await
        .with_context(|| format!("failed to import {}", catalog_path.display()))?;

    let mut table = Table::new();
    table.set_header(vec!["Entity", "Created", "Already present"]);
    table.add_row(vec![
        Cell::new("users"),
        Cell::new(summary.users_created),
        Cell::new(summary.users_existing),
    ]);
    table.add_row(vec![
        Cell::new("questions"),
        Cell::new(summary.questions_created),
        Cell::new("-"),
    ]);
    table.add_row(vec![
        Cell::new("exams"),
        Cell::new(summary.exams_created),
        Cell::new("-"),
    ]);
    println!("{table}");
    println!("Loaded {} into {}", catalog_path.display(), session.state.display());

    Ok(())
}
