//! The `evalua results` command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use evalua_core::model::{ExamId, UserId};
use evalua_core::store::ResultFilter;

use super::{format_instant, Session};

pub async fn execute(
    state: Option<PathBuf>,
    as_user: String,
    exam: Option<String>,
    student: Option<String>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let session = Session::open_existing(state, config_path.as_deref())?;
    let ctx = session.act_as(&as_user).await?;

    let mut filter = ResultFilter::default();
    if let Some(key) = &exam {
        filter.exam_id = Some(session.find_exam(&ctx, key).await?.id);
    }
    if let Some(username) = &student {
        let user = session
            .assessment
            .users()
            .find_by_username(&ctx, username)
            .await?;
        filter.student_id = Some(user.id);
    }

    let results = session.assessment.engine().get_results(&ctx, &filter).await?;

    match format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            return Ok(());
        }
        "table" => {}
        other => anyhow::bail!("unknown format: {other} (expected table or json)"),
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let titles: HashMap<ExamId, String> = session
        .assessment
        .exams()
        .list_exams(&ctx)
        .await?
        .into_iter()
        .map(|e| (e.id, e.title))
        .collect();
    let mut names: HashMap<UserId, String> = HashMap::new();
    for result in &results {
        if !names.contains_key(&result.student_id) {
            let user = session
                .assessment
                .users()
                .get_user(&ctx, result.student_id)
                .await?;
            names.insert(user.id, user.username);
        }
    }

    let mut table = Table::new();
    table.set_header(vec!["Exam", "Student", "Submitted", "Score", "%", "Review"]);
    for result in &results {
        table.add_row(vec![
            Cell::new(titles.get(&result.exam_id).map_or("?", String::as_str)),
            Cell::new(names.get(&result.student_id).map_or("?", String::as_str)),
            Cell::new(format_instant(result.submitted_at)),
            Cell::new(format!(
                "{:.2}/{}",
                result.score.points, result.score.max_points
            )),
            Cell::new(format!("{:.1}%", result.score.percentage)),
            Cell::new(if result.needs_review { "pending" } else { "" }),
        ]);
    }
    println!("{table}");

    Ok(())
}
