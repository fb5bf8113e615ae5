//! The `evalua submit` command.
//!
//! The answers file is a JSON object keyed by question number (1-based, in
//! exam order). Choice answers name options by their text:
//!
//! ```json
//! { "1": "Paris", "2": ["2", "4"], "3": "free text" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Deserialize;

use evalua_core::engine::SubmitRequest;
use evalua_core::exams::{ExamPaper, PaperQuestion};
use evalua_core::model::{Answer, AnswerSheet, OptionId, QuestionKind};

use super::{instant, Session};

/// One entry of the answers file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum AnswerInput {
    Choices(Vec<String>),
    Text(String),
}

fn read_answers(path: &Path) -> Result<BTreeMap<String, AnswerInput>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read answers file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse answers file: {}", path.display()))
}

fn option_id(question: &PaperQuestion, number: usize, text: &str) -> Result<OptionId> {
    question
        .options
        .iter()
        .find(|o| o.text == text.trim())
        .map(|o| o.id)
        .with_context(|| format!("question {number} has no option '{text}'"))
}

/// Turn numbered, text-based answers into an answer sheet for `paper`.
fn resolve(paper: &ExamPaper, inputs: BTreeMap<String, AnswerInput>) -> Result<AnswerSheet> {
    let mut sheet = AnswerSheet::new();
    for (key, input) in inputs {
        let number: usize = key
            .trim()
            .parse()
            .with_context(|| format!("answer key '{key}' is not a question number"))?;
        let question = number
            .checked_sub(1)
            .and_then(|i| paper.questions.get(i))
            .with_context(|| {
                format!(
                    "exam '{}' has no question {number} (it has {})",
                    paper.exam.title,
                    paper.questions.len()
                )
            })?;

        let answer = match (question.kind, input) {
            (QuestionKind::SingleChoice, AnswerInput::Text(text)) => Answer::Single {
                option: option_id(question, number, &text)?,
            },
            (QuestionKind::SingleChoice, AnswerInput::Choices(choices)) => {
                anyhow::ensure!(
                    choices.len() == 1,
                    "question {number} takes exactly one choice, got {}",
                    choices.len()
                );
                Answer::Single {
                    option: option_id(question, number, &choices[0])?,
                }
            }
            (QuestionKind::MultipleChoice, input) => {
                let choices = match input {
                    AnswerInput::Choices(choices) => choices,
                    AnswerInput::Text(text) => vec![text],
                };
                Answer::Multiple {
                    options: choices
                        .iter()
                        .map(|c| option_id(question, number, c))
                        .collect::<Result<Vec<_>>>()?,
                }
            }
            (QuestionKind::OpenText, AnswerInput::Text(text)) => Answer::Text { text },
            (QuestionKind::OpenText, AnswerInput::Choices(_)) => {
                anyhow::bail!("question {number} is open text; answer with a string")
            }
        };
        sheet.insert(question.id, answer);
    }
    Ok(sheet)
}

pub async fn execute(
    state: Option<PathBuf>,
    as_user: String,
    exam: String,
    answers_path: PathBuf,
    at: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let inputs = read_answers(&answers_path)?;
    let submitted_at = instant(at.as_deref())?;

    let session = Session::open_existing(state, config_path.as_deref())?;
    let ctx = session.act_as(&as_user).await?;
    let exam = session.find_exam(&ctx, &exam).await?;
    let paper = session.assessment.exams().exam_paper(&ctx, exam.id).await?;
    let answers = resolve(&paper, inputs)?;

    let submission = session
        .assessment
        .engine()
        .submit(
            &ctx,
            SubmitRequest {
                exam_id: exam.id,
                student_id: ctx.actor.id,
                answers,
                submitted_at,
            },
        )
        .await?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Points", "Review"]);
    for (i, outcome) in submission.outcomes.iter().enumerate() {
        let text = paper
            .questions
            .iter()
            .find(|q| q.id == outcome.question_id)
            .map(|q| q.text.as_str())
            .unwrap_or("?");
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(text),
            Cell::new(format!("{:.2}", outcome.points)),
            Cell::new(if outcome.needs_review { "pending" } else { "" }),
        ]);
    }
    println!("{table}");
    println!(
        "Score: {:.2}/{} ({:.1}%)",
        submission.score.points, submission.score.max_points, submission.score.percentage
    );
    if submission.needs_review {
        println!("Some answers await manual review.");
    }
    println!("Submission {} recorded for {}", submission.id, exam.title);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use evalua_core::exams::PaperOption;
    use evalua_core::model::{Exam, ExamId, QuestionId, UserId};

    fn paper() -> ExamPaper {
        let choice = |text: &str| PaperOption {
            id: OptionId::new(),
            text: text.into(),
        };
        let now = Utc::now();
        let questions = vec![
            PaperQuestion {
                id: QuestionId::new(),
                text: "Capital".into(),
                kind: QuestionKind::SingleChoice,
                options: vec![choice("Lyon"), choice("Paris")],
            },
            PaperQuestion {
                id: QuestionId::new(),
                text: "Evens".into(),
                kind: QuestionKind::MultipleChoice,
                options: vec![choice("2"), choice("3"), choice("4")],
            },
            PaperQuestion {
                id: QuestionId::new(),
                text: "Essay".into(),
                kind: QuestionKind::OpenText,
                options: vec![],
            },
        ];
        ExamPaper {
            exam: Exam {
                id: ExamId::new(),
                title: "Quiz".into(),
                description: String::new(),
                start_date: now,
                end_date: now,
                creator_id: UserId::new(),
                question_ids: questions.iter().map(|q| q.id).collect(),
                created_at: now,
                updated_at: now,
            },
            questions,
        }
    }

    fn inputs(json: &str) -> BTreeMap<String, AnswerInput> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn resolves_option_texts_by_question_number() {
        let paper = paper();
        let sheet = resolve(
            &paper,
            inputs(r#"{"1": "Paris", "2": ["2", "4"], "3": "Quicksort"}"#),
        )
        .unwrap();

        let q = &paper.questions;
        assert_eq!(
            sheet[&q[0].id],
            Answer::Single {
                option: q[0].options[1].id
            }
        );
        assert_eq!(
            sheet[&q[1].id],
            Answer::Multiple {
                options: vec![q[1].options[0].id, q[1].options[2].id]
            }
        );
        assert_eq!(
            sheet[&q[2].id],
            Answer::Text {
                text: "Quicksort".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_numbers_and_options() {
        let paper = paper();
        let err = resolve(&paper, inputs(r#"{"4": "x"}"#)).unwrap_err();
        assert!(err.to_string().contains("no question 4"));

        let err = resolve(&paper, inputs(r#"{"0": "x"}"#)).unwrap_err();
        assert!(err.to_string().contains("no question 0"));

        let err = resolve(&paper, inputs(r#"{"1": "Marseille"}"#)).unwrap_err();
        assert!(err.to_string().contains("no option 'Marseille'"));

        let err = resolve(&paper, inputs(r#"{"1": ["Lyon", "Paris"]}"#)).unwrap_err();
        assert!(err.to_string().contains("exactly one choice"));

        assert!(resolve(&paper, inputs(r#"{"3": ["a"]}"#)).is_err());
        assert!(resolve(&paper, inputs(r#"{"first": "Paris"}"#)).is_err());
    }

    #[test]
    fn missing_answers_are_left_for_the_engine() {
        let paper = paper();
        let sheet = resolve(&paper, inputs(r#"{"1": "Lyon"}"#)).unwrap();
        assert_eq!(sheet.len(), 1);
    }
}
