//! Exam lifecycle manager.
//!
//! Validation runs structural checks (non-empty fields, date order, duplicate
//! ids) before referential checks (questions and creator exist) before
//! cross-entity checks (creator role). An exam is written as a whole, so a
//! reader sees either none or all of a multi-question attach.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{self, AuditAction};
use crate::context::RequestContext;
use crate::error::{AssessmentError, EntityKind, Result};
use crate::guard::{authorize, Operation};
use crate::locks::{AggregateLocks, LockKey, LockSet};
use crate::model::{Exam, ExamId, OptionId, QuestionId, QuestionKind, Role, UserId};
use crate::store::EntityStore;

/// An exam to create, questions included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExam {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub creator_id: UserId,
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
}

/// Field-level exam edit. `question_ids` replaces the whole question list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub question_ids: Option<Vec<QuestionId>>,
}

/// A question as shown to someone taking the exam: no correctness flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperQuestion {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<PaperOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperOption {
    pub id: OptionId,
    pub text: String,
}

/// An exam and its questions in exam order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamPaper {
    pub exam: Exam,
    pub questions: Vec<PaperQuestion>,
}

fn check_structure(exam: &Exam) -> Result<()> {
    if exam.title.trim().is_empty() {
        return Err(AssessmentError::validation(
            EntityKind::Exam,
            "title",
            "must not be empty",
        ));
    }
    if exam.start_date >= exam.end_date {
        return Err(AssessmentError::validation(
            EntityKind::Exam,
            "end_date",
            format!(
                "must be after start_date ({} >= {})",
                exam.start_date, exam.end_date
            ),
        ));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = exam.question_ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AssessmentError::validation(
            EntityKind::Exam,
            "question_ids",
            format!("question {dup} listed twice"),
        ));
    }
    Ok(())
}

/// Create, edit and retire exams.
pub struct ExamLifecycle {
    store: Arc<dyn EntityStore>,
    locks: Arc<AggregateLocks>,
}

impl ExamLifecycle {
    pub fn new(store: Arc<dyn EntityStore>, locks: Arc<AggregateLocks>) -> Self {
        Self { store, locks }
    }

    /// Create an exam together with its question list.
    pub async fn create_exam(&self, ctx: &RequestContext, draft: NewExam) -> Result<Exam> {
        authorize(&ctx.actor, Operation::CreateExam)?;
        if ctx.actor.role != Role::Admin && draft.creator_id != ctx.actor.id {
            return Err(AssessmentError::PermissionDenied {
                role: ctx.actor.role,
                operation: format!("create exams on behalf of {}", draft.creator_id),
            });
        }

        let now = Utc::now();
        let exam = Exam {
            id: ExamId::new(),
            title: draft.title.trim().to_string(),
            description: draft.description,
            start_date: draft.start_date,
            end_date: draft.end_date,
            creator_id: draft.creator_id,
            question_ids: draft.question_ids,
            created_at: now,
            updated_at: now,
        };
        check_structure(&exam)?;

        let mut held = self.locks.session(ctx.timeout);
        self.check_questions(ctx, &mut held, &exam.question_ids)
            .await?;
        held.read(LockKey::User(exam.creator_id)).await?;
        self.check_creator(ctx, exam.creator_id).await?;

        ctx.store("put_exam", self.store.put_exam(exam.clone())).await?;
        audit::record(&*self.store, ctx, AuditAction::ExamCreated, exam.id).await;
        tracing::info!(
            exam = %exam.id,
            questions = exam.question_ids.len(),
            "exam created: {}",
            exam.title
        );
        Ok(exam)
    }

    pub async fn get_exam(&self, ctx: &RequestContext, id: ExamId) -> Result<Exam> {
        ctx.store("get_exam", self.store.get_exam(id))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Exam, id))
    }

    pub async fn list_exams(&self, ctx: &RequestContext) -> Result<Vec<Exam>> {
        ctx.store("list_exams", self.store.list_exams()).await
    }

    /// The exam with its questions, stripped of answers.
    ///
    /// Students read it to take the exam; authors read it to proof the exam.
    pub async fn exam_paper(&self, ctx: &RequestContext, id: ExamId) -> Result<ExamPaper> {
        let operation = match ctx.actor.role {
            Role::Student => Operation::TakeExam,
            Role::Admin | Role::Teacher => Operation::EditExam,
        };
        authorize(&ctx.actor, operation)?;

        let exam = self.get_exam(ctx, id).await?;
        let found = ctx
            .store("get_questions", self.store.get_questions(&exam.question_ids))
            .await?;
        let questions = exam
            .question_ids
            .iter()
            .map(|qid| {
                let question = found.iter().find(|q| q.id == *qid).ok_or_else(|| {
                    AssessmentError::conflict(
                        EntityKind::Exam,
                        id,
                        format!("question {qid} no longer exists"),
                    )
                })?;
                Ok(PaperQuestion {
                    id: question.id,
                    text: question.text.clone(),
                    kind: question.kind,
                    options: question
                        .options
                        .iter()
                        .map(|o| PaperOption {
                            id: o.id,
                            text: o.text.clone(),
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ExamPaper { exam, questions })
    }

    /// Exams whose window contains `as_of`, ordered by start date.
    pub async fn list_active_exams(
        &self,
        ctx: &RequestContext,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Exam>> {
        let exams = ctx.store("list_exams", self.store.list_exams()).await?;
        Ok(exams.into_iter().filter(|e| e.is_open_at(as_of)).collect())
    }

    /// Apply a field-level patch. The question list is frozen once the exam
    /// has a submission.
    pub async fn update_exam(
        &self,
        ctx: &RequestContext,
        id: ExamId,
        patch: ExamPatch,
    ) -> Result<Exam> {
        authorize(&ctx.actor, Operation::EditExam)?;

        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::Exam(id)).await?;
        let current = self.get_exam(ctx, id).await?;

        let mut updated = current.clone();
        if let Some(title) = patch.title {
            updated.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(start) = patch.start_date {
            updated.start_date = start;
        }
        if let Some(end) = patch.end_date {
            updated.end_date = end;
        }
        let changes_questions = patch
            .question_ids
            .as_ref()
            .is_some_and(|ids| *ids != current.question_ids);
        if let Some(ids) = patch.question_ids {
            updated.question_ids = ids;
        }

        // A frozen question set is a conflict whatever the new list holds.
        if changes_questions {
            self.ensure_unsubmitted(ctx, id).await?;
        }
        check_structure(&updated)?;
        if changes_questions {
            self.check_questions(ctx, &mut held, &updated.question_ids)
                .await?;
        }
        if updated == current {
            return Ok(current);
        }

        updated.updated_at = Utc::now();
        ctx.store("put_exam", self.store.put_exam(updated.clone()))
            .await?;
        audit::record(&*self.store, ctx, AuditAction::ExamUpdated, id).await;
        tracing::info!(exam = %id, questions_changed = changes_questions, "exam updated");
        Ok(updated)
    }

    /// Remove an exam that nobody has submitted. Questions are left alone.
    pub async fn delete_exam(&self, ctx: &RequestContext, id: ExamId) -> Result<()> {
        authorize(&ctx.actor, Operation::DeleteExam)?;

        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::Exam(id)).await?;
        self.get_exam(ctx, id).await?;
        self.ensure_unsubmitted(ctx, id).await?;

        ctx.store("delete_exam", self.store.delete_exam(id)).await?;
        audit::record(&*self.store, ctx, AuditAction::ExamDeleted, id).await;
        tracing::info!(exam = %id, "exam deleted");
        Ok(())
    }

    /// Append questions to the exam's ordered list, all or nothing.
    pub async fn attach_questions(
        &self,
        ctx: &RequestContext,
        id: ExamId,
        question_ids: Vec<QuestionId>,
    ) -> Result<Exam> {
        authorize(&ctx.actor, Operation::EditExam)?;
        if question_ids.is_empty() {
            return Err(AssessmentError::validation(
                EntityKind::Exam,
                "question_ids",
                "nothing to attach",
            ));
        }

        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::Exam(id)).await?;
        let current = self.get_exam(ctx, id).await?;

        self.ensure_unsubmitted(ctx, id).await?;
        let mut updated = current.clone();
        updated.question_ids.extend(question_ids.iter().copied());
        check_structure(&updated)?;
        self.check_questions(ctx, &mut held, &question_ids).await?;

        updated.updated_at = Utc::now();
        ctx.store("put_exam", self.store.put_exam(updated.clone()))
            .await?;
        audit::record(&*self.store, ctx, AuditAction::QuestionsAttached, id).await;
        tracing::info!(exam = %id, added = question_ids.len(), "questions attached");
        Ok(updated)
    }

    async fn ensure_unsubmitted(&self, ctx: &RequestContext, id: ExamId) -> Result<()> {
        let taken = ctx
            .store("count_submissions", self.store.count_submissions(id))
            .await?;
        if taken > 0 {
            return Err(AssessmentError::conflict(
                EntityKind::Exam,
                id,
                format!("question set is frozen after {taken} submission(s)"),
            ));
        }
        Ok(())
    }

    /// Lock the questions for reading and make sure they all exist.
    async fn check_questions(
        &self,
        ctx: &RequestContext,
        held: &mut LockSet,
        ids: &[QuestionId],
    ) -> Result<()> {
        held.read_all(ids.iter().map(|id| LockKey::Question(*id)))
            .await?;
        let found = ctx
            .store("get_questions", self.store.get_questions(ids))
            .await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|q| q.id == **id)) {
            return Err(AssessmentError::validation(
                EntityKind::Exam,
                "question_ids",
                format!("unknown question {missing}"),
            ));
        }
        Ok(())
    }

    async fn check_creator(&self, ctx: &RequestContext, creator_id: UserId) -> Result<()> {
        let creator = ctx
            .store("get_user", self.store.get_user(creator_id))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::User, creator_id))?;
        if !creator.role.can_author() {
            return Err(AssessmentError::validation(
                EntityKind::Exam,
                "creator_id",
                format!("{} is a {}, not a TEACHER or ADMIN", creator.username, creator.role),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::Actor;
    use crate::memory::MemoryStore;
    use crate::model::{Question, QuestionKind, Submission, SubmissionId, User};
    use crate::scoring::Score;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        store: Arc<MemoryStore>,
        exams: ExamLifecycle,
        teacher: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let teacher = User {
            id: UserId::new(),
            username: "tina".into(),
            role: Role::Teacher,
            created_at: Utc::now(),
        };
        store.put_user(teacher.clone()).await.unwrap();
        let exams = ExamLifecycle::new(store.clone(), Arc::new(AggregateLocks::new()));
        Fixture {
            store,
            exams,
            teacher,
        }
    }

    async fn question(store: &MemoryStore) -> QuestionId {
        let id = QuestionId::new();
        store
            .put_question(Question {
                id,
                text: "Explain".into(),
                kind: QuestionKind::OpenText,
                options: vec![],
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        id
    }

    fn ctx_for(user: &User) -> RequestContext {
        RequestContext::new(Actor::new(user.id, user.role))
    }

    fn draft(creator_id: UserId, question_ids: Vec<QuestionId>) -> NewExam {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        NewExam {
            title: "Midterm".into(),
            description: String::new(),
            start_date: start,
            end_date: start + Duration::hours(2),
            creator_id,
            question_ids,
        }
    }

    async fn take(store: &MemoryStore, exam_id: ExamId) {
        store
            .insert_submission(Submission {
                id: SubmissionId::new(),
                exam_id,
                student_id: UserId::new(),
                answers: Default::default(),
                submitted_at: Utc::now(),
                score: Score::from_points(0.0, 0),
                outcomes: vec![],
                needs_review: false,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_exam_keeps_question_order() {
        let f = fixture().await;
        let q1 = question(&f.store).await;
        let q2 = question(&f.store).await;
        let exam = f
            .exams
            .create_exam(&ctx_for(&f.teacher), draft(f.teacher.id, vec![q2, q1]))
            .await
            .unwrap();
        assert_eq!(exam.question_ids, vec![q2, q1]);
        assert_eq!(
            f.exams.get_exam(&ctx_for(&f.teacher), exam.id).await.unwrap(),
            exam
        );
    }

    #[tokio::test]
    async fn create_exam_validates_in_order() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);

        let mut backwards = draft(f.teacher.id, vec![]);
        backwards.end_date = backwards.start_date;
        let err = f.exams.create_exam(&ctx, backwards).await.unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { field, .. } if field == "end_date"));

        let mut untitled = draft(f.teacher.id, vec![QuestionId::new()]);
        untitled.title = "  ".into();
        let err = f.exams.create_exam(&ctx, untitled).await.unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { field, .. } if field == "title"));

        let err = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![QuestionId::new()]))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AssessmentError::Validation { field, .. } if field == "question_ids")
        );
        assert!(f.store.list_exams().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_exam_checks_creator() {
        let f = fixture().await;
        let admin = User {
            id: UserId::new(),
            username: "root".into(),
            role: Role::Admin,
            created_at: Utc::now(),
        };
        let student = User {
            id: UserId::new(),
            username: "sam".into(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        f.store.put_user(student.clone()).await.unwrap();

        let err = f
            .exams
            .create_exam(&ctx_for(&f.teacher), draft(UserId::new(), vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::PermissionDenied { .. }));

        let err = f
            .exams
            .create_exam(&ctx_for(&admin), draft(UserId::new(), vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::NotFound { .. }));

        let err = f
            .exams
            .create_exam(&ctx_for(&admin), draft(student.id, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { field, .. } if field == "creator_id"));

        let err = f
            .exams
            .create_exam(&ctx_for(&student), draft(student.id, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn attach_is_all_or_nothing() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);
        let q1 = question(&f.store).await;
        let exam = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![q1]))
            .await
            .unwrap();

        let q2 = question(&f.store).await;
        let err = f
            .exams
            .attach_questions(&ctx, exam.id, vec![q2, QuestionId::new()])
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { .. }));
        assert_eq!(f.exams.get_exam(&ctx, exam.id).await.unwrap().question_ids, vec![q1]);

        let err = f
            .exams
            .attach_questions(&ctx, exam.id, vec![q1])
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { .. }));

        let updated = f.exams.attach_questions(&ctx, exam.id, vec![q2]).await.unwrap();
        assert_eq!(updated.question_ids, vec![q1, q2]);
    }

    #[tokio::test]
    async fn submitted_exam_freezes_questions_but_not_metadata() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);
        let q1 = question(&f.store).await;
        let q2 = question(&f.store).await;
        let exam = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![q1]))
            .await
            .unwrap();
        take(&f.store, exam.id).await;

        let err = f
            .exams
            .attach_questions(&ctx, exam.id, vec![q2])
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Conflict { .. }));

        let err = f
            .exams
            .update_exam(
                &ctx,
                exam.id,
                ExamPatch {
                    question_ids: Some(vec![q2]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Conflict { .. }));

        let renamed = f
            .exams
            .update_exam(
                &ctx,
                exam.id,
                ExamPatch {
                    title: Some("Final".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "Final");
        assert_eq!(renamed.question_ids, vec![q1]);

        let err = f.exams.delete_exam(&ctx, exam.id).await.unwrap_err();
        assert!(matches!(err, AssessmentError::Conflict { .. }));
    }

    #[tokio::test]
    async fn frozen_question_set_conflicts_even_with_duplicate_ids() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);
        let q1 = question(&f.store).await;
        let exam = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![q1]))
            .await
            .unwrap();
        take(&f.store, exam.id).await;

        let err = f
            .exams
            .attach_questions(&ctx, exam.id, vec![q1])
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Conflict { .. }), "{err:?}");

        let err = f
            .exams
            .update_exam(
                &ctx,
                exam.id,
                ExamPatch {
                    question_ids: Some(vec![q1, q1]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Conflict { .. }), "{err:?}");
        assert_eq!(f.store.get_exam(exam.id).await.unwrap().unwrap(), exam);
    }

    #[tokio::test]
    async fn duplicate_ids_on_open_exam_are_a_validation_error() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);
        let q1 = question(&f.store).await;
        let exam = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![q1]))
            .await
            .unwrap();

        let err = f
            .exams
            .attach_questions(&ctx, exam.id, vec![q1])
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn update_rejects_inverted_window() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);
        let exam = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![]))
            .await
            .unwrap();
        let err = f
            .exams
            .update_exam(
                &ctx,
                exam.id,
                ExamPatch {
                    end_date: Some(exam.start_date - Duration::minutes(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { .. }));
        assert_eq!(f.exams.get_exam(&ctx, exam.id).await.unwrap(), exam);
    }

    #[tokio::test]
    async fn delete_keeps_questions() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);
        let q1 = question(&f.store).await;
        let exam = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![q1]))
            .await
            .unwrap();

        f.exams.delete_exam(&ctx, exam.id).await.unwrap();
        let err = f.exams.get_exam(&ctx, exam.id).await.unwrap_err();
        assert!(matches!(err, AssessmentError::NotFound { .. }));
        assert!(f.store.get_question(q1).await.unwrap().is_some());
        assert!(f.exams.delete_exam(&ctx, exam.id).await.is_err());
    }

    #[tokio::test]
    async fn active_exams_use_inclusive_window_sorted_by_start() {
        let f = fixture().await;
        let ctx = ctx_for(&f.teacher);
        let early = f
            .exams
            .create_exam(&ctx, draft(f.teacher.id, vec![]))
            .await
            .unwrap();
        let mut later = draft(f.teacher.id, vec![]);
        later.start_date = early.start_date + Duration::hours(1);
        later.end_date = early.end_date + Duration::hours(1);
        let later = f.exams.create_exam(&ctx, later).await.unwrap();

        let at_start = f
            .exams
            .list_active_exams(&ctx, early.start_date)
            .await
            .unwrap();
        assert_eq!(at_start.iter().map(|e| e.id).collect::<Vec<_>>(), vec![early.id]);

        let overlap = f
            .exams
            .list_active_exams(&ctx, early.end_date)
            .await
            .unwrap();
        assert_eq!(
            overlap.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![early.id, later.id]
        );

        let after = f
            .exams
            .list_active_exams(&ctx, later.end_date + Duration::seconds(1))
            .await
            .unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn paper_hides_correct_flags_and_keeps_order() {
        let f = fixture().await;
        let choice = QuestionId::new();
        f.store
            .put_question(Question {
                id: choice,
                text: "Pick one".into(),
                kind: QuestionKind::SingleChoice,
                options: vec![crate::model::AnswerOption {
                    id: OptionId::new(),
                    question_id: choice,
                    text: "yes".into(),
                    is_correct: true,
                }],
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let open = question(&f.store).await;
        let exam = f
            .exams
            .create_exam(&ctx_for(&f.teacher), draft(f.teacher.id, vec![open, choice]))
            .await
            .unwrap();

        let student = User {
            id: UserId::new(),
            username: "sam".into(),
            role: Role::Student,
            created_at: Utc::now(),
        };
        let paper = f.exams.exam_paper(&ctx_for(&student), exam.id).await.unwrap();
        assert_eq!(
            paper.questions.iter().map(|q| q.id).collect::<Vec<_>>(),
            vec![open, choice]
        );
        assert_eq!(paper.questions[1].options[0].text, "yes");
        let json = serde_json::to_string(&paper).unwrap();
        assert!(!json.contains("is_correct"));

        let err = f
            .exams
            .exam_paper(&ctx_for(&student), ExamId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::NotFound { .. }));
    }
}
