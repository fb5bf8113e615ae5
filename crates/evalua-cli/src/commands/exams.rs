//! The `evalua exams` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{format_instant, instant, Session};

pub async fn execute(
    state: Option<PathBuf>,
    as_of: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let session = Session::open_existing(state, config_path.as_deref())?;
    let ctx = session.reader();
    let now = instant(as_of.as_deref())?;

    let mut exams = if as_of.is_some() {
        session.assessment.exams().list_active_exams(&ctx, now).await?
    } else {
        session.assessment.exams().list_exams(&ctx).await?
    };
    exams.sort_by_key(|e| (e.start_date, e.title.clone()));

    if exams.is_empty() {
        println!("No exams.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Title", "Id", "Start", "End", "Questions", "Status"]);
    for exam in &exams {
        let status = if exam.is_open_at(now) {
            "open"
        } else if now < exam.start_date {
            "upcoming"
        } else {
            "closed"
        };
        table.add_row(vec![
            Cell::new(&exam.title),
            Cell::new(exam.id),
            Cell::new(format_instant(exam.start_date)),
            Cell::new(format_instant(exam.end_date)),
            Cell::new(exam.question_ids.len()),
            Cell::new(status),
        ]);
    }
    println!("{table}");

    Ok(())
}
