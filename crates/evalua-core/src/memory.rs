//! In-memory [`EntityStore`] with serializable snapshots.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::audit::AuditEntry;
use crate::error::StoreError;
use crate::model::{Exam, ExamId, Question, QuestionId, Submission, User, UserId};
use crate::store::{EntityStore, ResultFilter, StoreResult, SubmissionInsert};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    exams: HashMap<ExamId, Exam>,
    questions: HashMap<QuestionId, Question>,
    submissions: HashMap<(ExamId, UserId), Submission>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let mut tables = Tables {
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            exams: snapshot.exams.into_iter().map(|e| (e.id, e)).collect(),
            questions: snapshot.questions.into_iter().map(|q| (q.id, q)).collect(),
            submissions: HashMap::with_capacity(snapshot.submissions.len()),
            audit: snapshot.audit,
        };
        for submission in snapshot.submissions {
            let key = (submission.exam_id, submission.student_id);
            if tables.submissions.insert(key, submission).is_some() {
                return Err(StoreError::Backend(format!(
                    "snapshot holds two submissions for exam {} by student {}",
                    key.0, key.1
                )));
            }
        }
        Ok(tables)
    }
}

/// Flat, JSON-friendly copy of a store's contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub exams: Vec<Exam>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(default)]
    pub audit: Vec<AuditEntry>,
}

/// Store backed by hash maps behind a single async lock.
///
/// Readers share the lock, so a read never observes half of a write.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot, rejecting duplicate attempts.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        Ok(Self {
            tables: RwLock::new(Tables::from_snapshot(snapshot)?),
        })
    }

    /// Replace the whole contents with `snapshot`.
    ///
    /// On error the current contents are left untouched.
    pub async fn restore(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        let tables = Tables::from_snapshot(snapshot)?;
        *self.tables.write().await = tables;
        Ok(())
    }

    /// Copy the current contents, sorted for stable output.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        let mut exams: Vec<Exam> = tables.exams.values().cloned().collect();
        exams.sort_by_key(|e| (e.created_at, e.id));
        let mut questions: Vec<Question> = tables.questions.values().cloned().collect();
        questions.sort_by_key(|q| (q.created_at, q.id));
        let mut submissions: Vec<Submission> = tables.submissions.values().cloned().collect();
        submissions.sort_by_key(|s| (s.submitted_at, s.id));
        StoreSnapshot {
            users,
            exams,
            questions,
            submissions,
            audit: tables.audit.clone(),
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn put_user(&self, user: User) -> StoreResult<()> {
        self.tables.write().await.users.insert(user.id, user);
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }

    async fn get_exam(&self, id: ExamId) -> StoreResult<Option<Exam>> {
        Ok(self.tables.read().await.exams.get(&id).cloned())
    }

    async fn list_exams(&self) -> StoreResult<Vec<Exam>> {
        let mut exams: Vec<Exam> = self.tables.read().await.exams.values().cloned().collect();
        exams.sort_by_key(|e| (e.start_date, e.id));
        Ok(exams)
    }

    async fn put_exam(&self, exam: Exam) -> StoreResult<()> {
        self.tables.write().await.exams.insert(exam.id, exam);
        Ok(())
    }

    async fn delete_exam(&self, id: ExamId) -> StoreResult<bool> {
        Ok(self.tables.write().await.exams.remove(&id).is_some())
    }

    async fn get_question(&self, id: QuestionId) -> StoreResult<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.questions.get(id).cloned())
            .collect())
    }

    async fn list_questions(&self) -> StoreResult<Vec<Question>> {
        let mut questions: Vec<Question> = self
            .tables
            .read()
            .await
            .questions
            .values()
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.created_at, q.id));
        Ok(questions)
    }

    async fn put_question(&self, question: Question) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .questions
            .insert(question.id, question);
        Ok(())
    }

    async fn delete_question(&self, id: QuestionId) -> StoreResult<bool> {
        Ok(self.tables.write().await.questions.remove(&id).is_some())
    }

    async fn insert_submission(&self, submission: Submission) -> StoreResult<SubmissionInsert> {
        let mut tables = self.tables.write().await;
        let key = (submission.exam_id, submission.student_id);
        if let Some(existing) = tables.submissions.get(&key) {
            return Ok(SubmissionInsert::Existing(existing.clone()));
        }
        tables.submissions.insert(key, submission);
        Ok(SubmissionInsert::Inserted)
    }

    async fn get_submission(
        &self,
        exam_id: ExamId,
        student_id: UserId,
    ) -> StoreResult<Option<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables.submissions.get(&(exam_id, student_id)).cloned())
    }

    async fn list_submissions(&self, filter: &ResultFilter) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Submission> = tables
            .submissions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.submitted_at, s.id));
        Ok(found)
    }

    async fn count_submissions(&self, exam_id: ExamId) -> StoreResult<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .submissions
            .keys()
            .filter(|(exam, _)| *exam == exam_id)
            .count())
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        self.tables.write().await.audit.push(entry);
        Ok(())
    }

    async fn list_audit(&self) -> StoreResult<Vec<AuditEntry>> {
        Ok(self.tables.read().await.audit.clone())
    }
}
