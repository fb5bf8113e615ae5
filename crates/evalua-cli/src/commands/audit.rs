//! The `evalua audit` command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{format_instant, Session};

pub async fn execute(
    state: Option<PathBuf>,
    as_user: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let session = Session::open_existing(state, config_path.as_deref())?;
    let ctx = session.act_as(&as_user).await?;
    let entries = session.assessment.reporting().audit_log(&ctx).await?;

    // Deleted users keep their id in the log.
    let names: HashMap<_, _> = session
        .assessment
        .users()
        .list_users(&ctx)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["At", "Actor", "Action", "Target"]);
    for entry in &entries {
        let actor = names
            .get(&entry.actor_id)
            .cloned()
            .unwrap_or_else(|| entry.actor_id.to_string());
        table.add_row(vec![
            Cell::new(format_instant(entry.at)),
            Cell::new(actor),
            Cell::new(entry.action),
            Cell::new(&entry.target),
        ]);
    }
    println!("{table}");

    Ok(())
}
