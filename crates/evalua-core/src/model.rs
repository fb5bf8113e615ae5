//! Core data model types for evalua.
//!
//! Users, exams, questions with their options, and submissions. Questions are
//! shared between exams; an exam only holds an ordered list of question ids.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{QuestionOutcome, Score};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

entity_id!(
    /// Identifies a [`User`].
    UserId
);
entity_id!(
    /// Identifies an [`Exam`].
    ExamId
);
entity_id!(
    /// Identifies a [`Question`].
    QuestionId
);
entity_id!(
    /// Identifies an [`AnswerOption`].
    OptionId
);
entity_id!(
    /// Identifies a [`Submission`].
    SubmissionId
);

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    /// Roles that may author exams.
    pub fn can_author(self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Teacher => write!(f, "TEACHER"),
            Role::Student => write!(f, "STUDENT"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A time-windowed set of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub creator_id: UserId,
    /// Ordered references to shared questions.
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exam {
    /// Whether `at` falls inside `[start_date, end_date]`.
    pub fn is_open_at(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.end_date
    }
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    OpenText,
}

impl QuestionKind {
    /// Closed-ended kinds carry options and are scored automatically.
    pub fn has_options(self) -> bool {
        !matches!(self, QuestionKind::OpenText)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::SingleChoice => write!(f, "single_choice"),
            QuestionKind::MultipleChoice => write!(f, "multiple_choice"),
            QuestionKind::OpenText => write!(f, "open_text"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "single_choice" | "single" => Ok(QuestionKind::SingleChoice),
            "multiple_choice" | "multiple" | "multi" => Ok(QuestionKind::MultipleChoice),
            "open_text" | "open" | "text" => Ok(QuestionKind::OpenText),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// A reusable question and the options it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    /// Ordered options; empty for open text questions.
    #[serde(default)]
    pub options: Vec<AnswerOption>,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }

    pub fn has_option(&self, id: OptionId) -> bool {
        self.option(id).is_some()
    }

    /// The set of option ids flagged correct.
    pub fn correct_options(&self) -> BTreeSet<OptionId> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id)
            .collect()
    }
}

/// A selectable answer belonging to exactly one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

/// A student's answer to one question, tagged by question kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Answer {
    Single { option: OptionId },
    Multiple { options: Vec<OptionId> },
    Text { text: String },
}

impl Answer {
    /// The question kind this answer shape is meant for.
    pub fn kind(&self) -> QuestionKind {
        match self {
            Answer::Single { .. } => QuestionKind::SingleChoice,
            Answer::Multiple { .. } => QuestionKind::MultipleChoice,
            Answer::Text { .. } => QuestionKind::OpenText,
        }
    }

    /// Sort a multiple choice selection so equal sets compare equal.
    pub fn normalize(&mut self) {
        if let Answer::Multiple { options } = self {
            options.sort();
        }
    }
}

/// Answers keyed by question.
pub type AnswerSheet = BTreeMap<QuestionId, Answer>;

/// A graded, immutable exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub exam_id: ExamId,
    pub student_id: UserId,
    pub answers: AnswerSheet,
    pub submitted_at: DateTime<Utc>,
    pub score: Score,
    /// Per-question points in exam order.
    pub outcomes: Vec<QuestionOutcome>,
    /// Set when at least one answer awaits manual grading.
    #[serde(default)]
    pub needs_review: bool,
}
