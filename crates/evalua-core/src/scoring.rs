//! Answer validation and scoring.
//!
//! Scoring is deterministic: the same questions and answers always produce
//! the same [`Grade`]. Every question is worth one point.
//!
//! - `SINGLE_CHOICE`: 1 if the selected option is correct, else 0.
//! - `MULTIPLE_CHOICE`: all-or-nothing by default; the selected set must equal
//!   the correct set exactly. [`MultipleChoicePolicy::Proportional`] awards
//!   `(hits - misses) / correct`, floored at 0.
//! - `OPEN_TEXT`: 0 and flagged for review, unless an [`OpenTextGrader`]
//!   returns a fraction for it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, EntityKind, Result};
use crate::model::{Answer, AnswerSheet, OptionId, Question, QuestionId, QuestionKind};

/// How multiple choice answers earn points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultipleChoicePolicy {
    #[default]
    AllOrNothing,
    Proportional,
}

/// Scoring knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoringPolicy {
    #[serde(default)]
    pub multiple_choice: MultipleChoicePolicy,
}

/// Caller-supplied grading for open text answers.
pub trait OpenTextGrader: Send + Sync {
    /// Return the earned fraction in `[0, 1]`, or `None` to leave the answer
    /// for manual review.
    fn grade(&self, question: &Question, text: &str) -> Option<f64>;
}

/// Points earned on one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub points: f64,
    #[serde(default)]
    pub needs_review: bool,
}

/// Total score of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub points: f64,
    /// One point per exam question.
    pub max_points: u32,
    /// `100 * points / max_points`, or 0 for an exam without questions.
    pub percentage: f64,
}

impl Score {
    pub fn from_points(points: f64, max_points: u32) -> Self {
        let percentage = if max_points == 0 {
            0.0
        } else {
            100.0 * points / f64::from(max_points)
        };
        Self {
            points,
            max_points,
            percentage,
        }
    }
}

/// Scoring result for a full answer sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub score: Score,
    pub outcomes: Vec<QuestionOutcome>,
    pub needs_review: bool,
}

fn invalid(question_id: QuestionId, message: impl Into<String>) -> AssessmentError {
    AssessmentError::validation(
        EntityKind::Submission,
        format!("answers[{question_id}]"),
        message,
    )
}

/// Check that `answers` covers exactly `questions`, each with a well-formed
/// answer. Nothing is scored unless the whole sheet passes.
pub fn check_answers(questions: &[Question], answers: &AnswerSheet) -> Result<()> {
    for question in questions {
        let Some(answer) = answers.get(&question.id) else {
            return Err(invalid(question.id, "no answer provided"));
        };
        if answer.kind() != question.kind {
            return Err(invalid(
                question.id,
                format!("expected a {} answer, got {}", question.kind, answer.kind()),
            ));
        }
        match answer {
            Answer::Single { option } => {
                if !question.has_option(*option) {
                    return Err(invalid(
                        question.id,
                        format!("option {option} does not belong to this question"),
                    ));
                }
            }
            Answer::Multiple { options } => {
                if options.is_empty() {
                    return Err(invalid(question.id, "select at least one option"));
                }
                let mut seen = BTreeSet::new();
                for option in options {
                    if !seen.insert(*option) {
                        return Err(invalid(
                            question.id,
                            format!("option {option} selected twice"),
                        ));
                    }
                    if !question.has_option(*option) {
                        return Err(invalid(
                            question.id,
                            format!("option {option} does not belong to this question"),
                        ));
                    }
                }
            }
            Answer::Text { text } => {
                if text.trim().is_empty() {
                    return Err(invalid(question.id, "answer text is empty"));
                }
            }
        }
    }

    if let Some(extra) = answers
        .keys()
        .find(|id| !questions.iter().any(|q| q.id == **id))
    {
        return Err(invalid(*extra, "question is not part of this exam"));
    }

    Ok(())
}

/// Score a sheet that already passed [`check_answers`].
///
/// `questions` must be in exam order; outcomes follow it.
pub fn grade(
    questions: &[Question],
    answers: &AnswerSheet,
    policy: &ScoringPolicy,
    grader: Option<&dyn OpenTextGrader>,
) -> Grade {
    let mut outcomes = Vec::with_capacity(questions.len());

    for question in questions {
        let (points, needs_review) = match (question.kind, answers.get(&question.id)) {
            (QuestionKind::SingleChoice, Some(Answer::Single { option })) => {
                let correct = question.option(*option).is_some_and(|o| o.is_correct);
                (if correct { 1.0 } else { 0.0 }, false)
            }
            (QuestionKind::MultipleChoice, Some(Answer::Multiple { options })) => {
                (score_multiple(question, options, policy.multiple_choice), false)
            }
            (QuestionKind::OpenText, Some(Answer::Text { text })) => {
                match grader.and_then(|g| g.grade(question, text)) {
                    Some(fraction) if fraction.is_finite() => (fraction.clamp(0.0, 1.0), false),
                    _ => (0.0, true),
                }
            }
            _ => (0.0, false),
        };
        outcomes.push(QuestionOutcome {
            question_id: question.id,
            points,
            needs_review,
        });
    }

    let points = outcomes.iter().map(|o| o.points).sum();
    let needs_review = outcomes.iter().any(|o| o.needs_review);
    Grade {
        score: Score::from_points(points, questions.len() as u32),
        outcomes,
        needs_review,
    }
}

fn score_multiple(question: &Question, selected: &[OptionId], policy: MultipleChoicePolicy) -> f64 {
    let correct = question.correct_options();
    let selected: BTreeSet<OptionId> = selected.iter().copied().collect();

    match policy {
        MultipleChoicePolicy::AllOrNothing => {
            if selected == correct {
                1.0
            } else {
                0.0
            }
        }
        MultipleChoicePolicy::Proportional => {
            if correct.is_empty() {
                return 0.0;
            }
            let hits = selected.intersection(&correct).count() as f64;
            let misses = selected.difference(&correct).count() as f64;
            ((hits - misses) / correct.len() as f64).max(0.0)
        }
    }
}
