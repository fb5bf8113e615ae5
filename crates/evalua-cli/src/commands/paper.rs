//! The `evalua paper` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{format_instant, Session};

pub async fn execute(
    state: Option<PathBuf>,
    as_user: String,
    exam: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let session = Session::open_existing(state, config_path.as_deref())?;
    let ctx = session.act_as(&as_user).await?;
    let exam = session.find_exam(&ctx, &exam).await?;
    let paper = session.assessment.exams().exam_paper(&ctx, exam.id).await?;

    println!("{} ({})", paper.exam.title, paper.exam.id);
    if !paper.exam.description.is_empty() {
        println!("{}", paper.exam.description);
    }
    println!(
        "Window: {} .. {}",
        format_instant(paper.exam.start_date),
        format_instant(paper.exam.end_date)
    );

    for (i, question) in paper.questions.iter().enumerate() {
        println!("\n{}. {} [{}]", i + 1, question.text, question.kind);
        for option in &question.options {
            println!("   - {}", option.text);
        }
    }

    Ok(())
}
