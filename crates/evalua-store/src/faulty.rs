//! Fault-injecting store wrapper for testing.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use evalua_core::audit::AuditEntry;
use evalua_core::model::{Exam, ExamId, Question, QuestionId, Submission, User, UserId};
use evalua_core::store::{EntityStore, ResultFilter, StoreResult, SubmissionInsert};
use evalua_core::StoreError;

/// Wraps another store and makes selected calls slow or unavailable.
///
/// Lets tests exercise timeout and retry paths of the core without a real
/// flaky backend. Failures can hit any call, only mutations, or the reply of
/// a mutation that the inner store already applied.
pub struct FaultyStore {
    inner: Arc<dyn EntityStore>,
    /// Number of upcoming calls that fail with `Unavailable`.
    failures: AtomicU32,
    /// Number of upcoming mutations that fail before reaching the inner store.
    write_failures: AtomicU32,
    /// Number of upcoming mutations that are applied but report `Unavailable`.
    lost_acks: AtomicU32,
    /// Delay added to every call, in milliseconds.
    delay_ms: AtomicU64,
    /// Number of calls made.
    call_count: AtomicU32,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn EntityStore>) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(0),
            write_failures: AtomicU32::new(0),
            lost_acks: AtomicU32::new(0),
            delay_ms: AtomicU64::new(0),
            call_count: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` calls with [`StoreError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` mutations without applying them; reads pass through.
    pub fn fail_next_write(&self, n: u32) {
        self.write_failures.store(n, Ordering::SeqCst);
    }

    /// Apply the next `n` mutations but answer each with
    /// [`StoreError::Unavailable`], as if the reply was lost on the way back.
    pub fn drop_next_ack(&self, n: u32) {
        self.lost_acks.store(n, Ordering::SeqCst);
    }

    /// Delay every call by `delay`; zero turns the delay off.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Get the number of calls made to this store.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    async fn before(&self, call: &str) -> StoreResult<()> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if take(&self.failures) {
            tracing::debug!("injected failure on {call}");
            return Err(StoreError::Unavailable(format!("injected failure on {call}")));
        }
        Ok(())
    }

    async fn before_write(&self, call: &str) -> StoreResult<()> {
        self.before(call).await?;
        if take(&self.write_failures) {
            tracing::debug!("injected write failure on {call}");
            return Err(StoreError::Unavailable(format!("injected failure on {call}")));
        }
        Ok(())
    }

    fn after_write<T>(&self, call: &str, result: StoreResult<T>) -> StoreResult<T> {
        let value = result?;
        if take(&self.lost_acks) {
            tracing::debug!("dropped reply of {call}");
            return Err(StoreError::Unavailable(format!("reply lost after {call}")));
        }
        Ok(value)
    }
}

/// Decrement `counter` if it is positive, reporting whether it was.
fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl EntityStore for FaultyStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.before("get_user").await?;
        self.inner.get_user(id).await
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        self.before("find_user").await?;
        self.inner.find_user(username).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.before("list_users").await?;
        self.inner.list_users().await
    }

    async fn put_user(&self, user: User) -> StoreResult<()> {
        self.before_write("put_user").await?;
        let result = self.inner.put_user(user).await;
        self.after_write("put_user", result)
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        self.before_write("delete_user").await?;
        let result = self.inner.delete_user(id).await;
        self.after_write("delete_user", result)
    }

    async fn get_exam(&self, id: ExamId) -> StoreResult<Option<Exam>> {
        self.before("get_exam").await?;
        self.inner.get_exam(id).await
    }

    async fn list_exams(&self) -> StoreResult<Vec<Exam>> {
        self.before("list_exams").await?;
        self.inner.list_exams().await
    }

    async fn put_exam(&self, exam: Exam) -> StoreResult<()> {
        self.before_write("put_exam").await?;
        let result = self.inner.put_exam(exam).await;
        self.after_write("put_exam", result)
    }

    async fn delete_exam(&self, id: ExamId) -> StoreResult<bool> {
        self.before_write("delete_exam").await?;
        let result = self.inner.delete_exam(id).await;
        self.after_write("delete_exam", result)
    }

    async fn get_question(&self, id: QuestionId) -> StoreResult<Option<Question>> {
        self.before("get_question").await?;
        self.inner.get_question(id).await
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> StoreResult<Vec<Question>> {
        self.before("get_questions").await?;
        self.inner.get_questions(ids).await
    }

    async fn list_questions(&self) -> StoreResult<Vec<Question>> {
        self.before("list_questions").await?;
        self.inner.list_questions().await
    }

    async fn put_question(&self, question: Question) -> StoreResult<()> {
        self.before_write("put_question").await?;
        let result = self.inner.put_question(question).await;
        self.after_write("put_question", result)
    }

    async fn delete_question(&self, id: QuestionId) -> StoreResult<bool> {
        self.before_write("delete_question").await?;
        let result = self.inner.delete_question(id).await;
        self.after_write("delete_question", result)
    }

    async fn insert_submission(&self, submission: Submission) -> StoreResult<SubmissionInsert> {
        self.before_write("insert_submission").await?;
        let result = self.inner.insert_submission(submission).await;
        self.after_write("insert_submission", result)
    }

    async fn get_submission(
        &self,
        exam_id: ExamId,
        student_id: UserId,
    ) -> StoreResult<Option<Submission>> {
        self.before("get_submission").await?;
        self.inner.get_submission(exam_id, student_id).await
    }

    async fn list_submissions(&self, filter: &ResultFilter) -> StoreResult<Vec<Submission>> {
        self.before("list_submissions").await?;
        self.inner.list_submissions(filter).await
    }

    async fn count_submissions(&self, exam_id: ExamId) -> StoreResult<usize> {
        self.before("count_submissions").await?;
        self.inner.count_submissions(exam_id).await
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        self.before_write("append_audit").await?;
        let result = self.inner.append_audit(entry).await;
        self.after_write("append_audit", result)
    }

    async fn list_audit(&self) -> StoreResult<Vec<AuditEntry>> {
        self.before("list_audit").await?;
        self.inner.list_audit().await
    }
}
