//! The `evalua stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::Session;

pub async fn execute(
    state: Option<PathBuf>,
    as_user: String,
    exam: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let session = Session::open_existing(state, config_path.as_deref())?;
    let ctx = session.act_as(&as_user).await?;
    let reporting = session.assessment.reporting();

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);

    if let Some(key) = exam {
        let exam = session.find_exam(&ctx, &key).await?;
        let summary = reporting.exam_summary(&ctx, exam.id).await?;
        println!("Exam: {}", exam.title);
        table.add_row(vec![Cell::new("Submissions"), Cell::new(summary.submissions)]);
        for (label, value) in [
            ("Mean", summary.mean_percentage),
            ("Best", summary.best_percentage),
            ("Worst", summary.worst_percentage),
        ] {
            table.add_row(vec![Cell::new(label), Cell::new(format!("{value:.1}%"))]);
        }
        table.add_row(vec![
            Cell::new("Awaiting review"),
            Cell::new(summary.awaiting_review),
        ]);
    } else {
        let stats = reporting.stats(&ctx).await?;
        table.add_row(vec![Cell::new("Exams"), Cell::new(stats.total_exams)]);
        table.add_row(vec![Cell::new("Users"), Cell::new(stats.total_users)]);
        table.add_row(vec![
            Cell::new("Submissions"),
            Cell::new(stats.total_submissions),
        ]);
        table.add_row(vec![
            Cell::new("Average score"),
            Cell::new(format!("{:.1}%", stats.average_percentage)),
        ]);
    }
    println!("{table}");

    Ok(())
}
