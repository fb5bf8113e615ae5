//! Entity store persisted as a JSON snapshot file.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use evalua_core::audit::AuditEntry;
use evalua_core::memory::{MemoryStore, StoreSnapshot};
use evalua_core::model::{Exam, ExamId, Question, QuestionId, Submission, User, UserId};
use evalua_core::store::{EntityStore, ResultFilter, StoreResult, SubmissionInsert};

use crate::error::SnapshotError;

/// A [`MemoryStore`] that rewrites its snapshot file after every mutation.
///
/// The file is replaced atomically, so a crash leaves either the old or the
/// new snapshot on disk. Mutations are serialized so snapshots are written in
/// the order the changes were applied. A mutation whose snapshot cannot be
/// written is rolled back in memory before the error is returned.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    writer: Mutex<()>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let snapshot = read_snapshot(&path)?;
            tracing::debug!(
                users = snapshot.users.len(),
                exams = snapshot.exams.len(),
                submissions = snapshot.submissions.len(),
                "loaded snapshot {}",
                path.display()
            );
            MemoryStore::from_snapshot(snapshot)
                .with_context(|| format!("invalid snapshot: {}", path.display()))?
        } else {
            MemoryStore::new()
        };
        Ok(Self {
            path,
            inner,
            writer: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents, as they would be written to disk.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.inner.snapshot().await
    }

    /// Write the current contents to disk.
    pub async fn flush(&self) -> Result<(), SnapshotError> {
        let snapshot = self.inner.snapshot().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_snapshot(&path, &snapshot))
            .await
            .map_err(|e| SnapshotError::Writer(e.to_string()))?
    }

    async fn persist(&self) -> StoreResult<()> {
        self.flush().await.map_err(|e| {
            tracing::warn!("failed to persist {}: {e}", self.path.display());
            e.into()
        })
    }

    /// Run `apply` under the writer lock and persist when `changed` says so.
    async fn mutate<T, F>(&self, apply: F, changed: fn(&T) -> bool) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
        T: Send,
    {
        let _writer = self.writer.lock().await;
        let before = self.inner.snapshot().await;
        let value = apply.await?;
        if changed(&value) {
            if let Err(e) = self.persist().await {
                if let Err(restore) = self.inner.restore(before).await {
                    tracing::error!("failed to roll back {}: {restore}", self.path.display());
                }
                return Err(e);
            }
        }
        Ok(value)
    }
}

/// Read and decode a snapshot file.
pub fn read_snapshot(path: &Path) -> Result<StoreSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    let snapshot = serde_json::from_str(&content).map_err(|e| SnapshotError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(snapshot)
}

fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_vec_pretty(snapshot).map_err(|e| SnapshotError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&json).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.inner.get_user(id).await
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<User>> {
        self.inner.find_user(username).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn put_user(&self, user: User) -> StoreResult<()> {
        self.mutate(self.inner.put_user(user), |_| true).await
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        self.mutate(self.inner.delete_user(id), |removed| *removed).await
    }

    async fn get_exam(&self, id: ExamId) -> StoreResult<Option<Exam>> {
        self.inner.get_exam(id).await
    }

    async fn list_exams(&self) -> StoreResult<Vec<Exam>> {
        self.inner.list_exams().await
    }

    async fn put_exam(&self, exam: Exam) -> StoreResult<()> {
        self.mutate(self.inner.put_exam(exam), |_| true).await
    }

    async fn delete_exam(&self, id: ExamId) -> StoreResult<bool> {
        self.mutate(self.inner.delete_exam(id), |removed| *removed).await
    }

    async fn get_question(&self, id: QuestionId) -> StoreResult<Option<Question>> {
        self.inner.get_question(id).await
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> StoreResult<Vec<Question>> {
        self.inner.get_questions(ids).await
    }

    async fn list_questions(&self) -> StoreResult<Vec<Question>> {
        self.inner.list_questions().await
    }

    async fn put_question(&self, question: Question) -> StoreResult<()> {
        self.mutate(self.inner.put_question(question), |_| true).await
    }

    async fn delete_question(&self, id: QuestionId) -> StoreResult<bool> {
        self.mutate(self.inner.delete_question(id), |removed| *removed).await
    }

    async fn insert_submission(&self, submission: Submission) -> StoreResult<SubmissionInsert> {
        self.mutate(self.inner.insert_submission(submission), |outcome| {
            *outcome == SubmissionInsert::Inserted
        })
        .await
    }

    async fn get_submission(
        &self,
        exam_id: ExamId,
        student_id: UserId,
    ) -> StoreResult<Option<Submission>> {
        self.inner.get_submission(exam_id, student_id).await
    }

    async fn list_submissions(&self, filter: &ResultFilter) -> StoreResult<Vec<Submission>> {
        self.inner.list_submissions(filter).await
    }

    async fn count_submissions(&self, exam_id: ExamId) -> StoreResult<usize> {
        self.inner.count_submissions(exam_id).await
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        self.mutate(self.inner.append_audit(entry), |_| true).await
    }

    async fn list_audit(&self) -> StoreResult<Vec<AuditEntry>> {
        self.inner.list_audit().await
    }
}
