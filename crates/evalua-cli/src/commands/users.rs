//! The `evalua users` command.

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
    let users = session.assessment.users().list_users(&ctx).await?;

    let mut table = Table::new();
    table.set_header(vec!["Username", "Role", "Id", "Created"]);
    for user in &users {
        table.add_row(vec![
            Cell::new(&user.username),
            Cell::new(user.role),
            Cell::new(user.id),
            Cell::new(format_instant(user.created_at)),
        ]);
    }
    println!("{table}");
    println!("{} user(s)", users.len());

    Ok(())
}
