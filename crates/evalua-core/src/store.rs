//! Storage seam for the assessment core.
//!
//! Implementations must make each call atomic with respect to the others:
//! a `put_exam` replaces the whole aggregate, and `insert_submission` checks
//! the (exam, student) uniqueness constraint and inserts in one step.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::error::StoreError;
use crate::model::{Exam, ExamId, Question, QuestionId, Submission, User, UserId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a uniqueness-checked submission insert.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionInsert {
    Inserted,
    /// A submission for the same (exam, student) pair was already stored.
    Existing(Submission),
}

/// Narrows a submission listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    #[serde(default)]
    pub exam_id: Option<ExamId>,
    #[serde(default)]
    pub student_id: Option<UserId>,
}

impl ResultFilter {
    pub fn exam(exam_id: ExamId) -> Self {
        Self {
            exam_id: Some(exam_id),
            student_id: None,
        }
    }

    pub fn student(student_id: UserId) -> Self {
        Self {
            exam_id: None,
            student_id: Some(student_id),
        }
    }

    pub fn matches(&self, submission: &Submission) -> bool {
        self.exam_id.map_or(true, |id| id == submission.exam_id)
            && self.student_id.map_or(true, |id| id == submission.student_id)
    }
}

/// CRUD primitives over users, exams, questions, submissions and the audit log.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn find_user(&self, username: &str) -> StoreResult<Option<User>>;
    /// Users ordered by username.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn put_user(&self, user: User) -> StoreResult<()>;
    async fn delete_user(&self, id: UserId) -> StoreResult<bool>;

    async fn get_exam(&self, id: ExamId) -> StoreResult<Option<Exam>>;
    /// Exams ordered by start date.
    async fn list_exams(&self) -> StoreResult<Vec<Exam>>;
    async fn put_exam(&self, exam: Exam) -> StoreResult<()>;
    async fn delete_exam(&self, id: ExamId) -> StoreResult<bool>;

    async fn get_question(&self, id: QuestionId) -> StoreResult<Option<Question>>;
    /// Fetch several questions in the order requested, skipping missing ids.
    async fn get_questions(&self, ids: &[QuestionId]) -> StoreResult<Vec<Question>>;
    /// Questions ordered by creation time.
    async fn list_questions(&self) -> StoreResult<Vec<Question>>;
    async fn put_question(&self, question: Question) -> StoreResult<()>;
    async fn delete_question(&self, id: QuestionId) -> StoreResult<bool>;

    async fn insert_submission(&self, submission: Submission) -> StoreResult<SubmissionInsert>;
    async fn get_submission(
        &self,
        exam_id: ExamId,
        student_id: UserId,
    ) -> StoreResult<Option<Submission>>;
    /// Matching submissions ordered by submission time.
    async fn list_submissions(&self, filter: &ResultFilter) -> StoreResult<Vec<Submission>>;
    async fn count_submissions(&self, exam_id: ExamId) -> StoreResult<usize>;

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()>;
    async fn list_audit(&self) -> StoreResult<Vec<AuditEntry>>;
}
