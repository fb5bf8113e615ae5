//! Submission and scoring engine.
//!
//! Accepts a student's answer sheet for an exam, checks it against the exam's
//! questions, grades it and records the immutable [`Submission`]. A retried
//! request with the same answers and timestamp gets the stored submission
//! back instead of a duplicate error.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{self, AuditAction};
use crate::context::RequestContext;
use crate::error::{AssessmentError, EntityKind, Result};
use crate::guard::{authorize, Operation, ResultScope};
use crate::locks::{AggregateLocks, LockKey};
use crate::model::{Answer, AnswerSheet, ExamId, Role, Submission, SubmissionId, UserId};
use crate::scoring::{check_answers, grade, OpenTextGrader, ScoringPolicy};
use crate::store::{EntityStore, ResultFilter, SubmissionInsert};

/// One exam attempt as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub exam_id: ExamId,
    pub student_id: UserId,
    pub answers: AnswerSheet,
    pub submitted_at: DateTime<Utc>,
}

/// Grades and records submissions, and answers result queries.
pub struct SubmissionEngine {
    store: Arc<dyn EntityStore>,
    locks: Arc<AggregateLocks>,
    policy: ScoringPolicy,
    grader: Option<Arc<dyn OpenTextGrader>>,
}

impl SubmissionEngine {
    pub fn new(
        store: Arc<dyn EntityStore>,
        locks: Arc<AggregateLocks>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            store,
            locks,
            policy,
            grader: None,
        }
    }

    /// Grade open text answers with `grader` instead of leaving them for review.
    pub fn with_grader(mut self, grader: Arc<dyn OpenTextGrader>) -> Self {
        self.grader = Some(grader);
        self
    }

    pub fn policy(&self) -> ScoringPolicy {
        self.policy
    }

    /// Validate, grade and record one attempt.
    pub async fn submit(&self, ctx: &RequestContext, mut request: SubmitRequest) -> Result<Submission> {
        authorize(&ctx.actor, Operation::TakeExam)?;
        if ctx.actor.role == Role::Student && request.student_id != ctx.actor.id {
            return Err(AssessmentError::PermissionDenied {
                role: ctx.actor.role,
                operation: format!("submit on behalf of {}", request.student_id),
            });
        }

        request.answers.values_mut().for_each(Answer::normalize);

        let mut held = self.locks.session(ctx.timeout);
        held.read(LockKey::Exam(request.exam_id)).await?;
        let exam = ctx
            .store("get_exam", self.store.get_exam(request.exam_id))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Exam, request.exam_id))?;
        held.read_all(exam.question_ids.iter().map(|id| LockKey::Question(*id)))
            .await?;
        held.read(LockKey::User(request.student_id)).await?;
        self.check_student(ctx, request.student_id).await?;

        if !exam.is_open_at(request.submitted_at) {
            tracing::warn!(
                exam = %exam.id,
                student = %request.student_id,
                "submission at {} rejected: window is {} .. {}",
                request.submitted_at,
                exam.start_date,
                exam.end_date
            );
            return Err(AssessmentError::OutOfWindow {
                exam_id: exam.id,
                submitted_at: request.submitted_at,
                start: exam.start_date,
                end: exam.end_date,
            });
        }

        held.write(LockKey::Attempt(exam.id, request.student_id))
            .await?;
        let previous = ctx
            .store(
                "get_submission",
                self.store.get_submission(exam.id, request.student_id),
            )
            .await?;
        if let Some(stored) = previous {
            return replay(stored, &request);
        }

        let questions = ctx
            .store("get_questions", self.store.get_questions(&exam.question_ids))
            .await?;
        if questions.len() != exam.question_ids.len() {
            return Err(AssessmentError::conflict(
                EntityKind::Exam,
                exam.id,
                "exam references a question that no longer exists",
            ));
        }
        if let Err(e) = check_answers(&questions, &request.answers) {
            tracing::warn!(exam = %exam.id, student = %request.student_id, "submission rejected: {e}");
            return Err(e);
        }
        let graded = grade(
            &questions,
            &request.answers,
            &self.policy,
            self.grader.as_deref(),
        );

        let submission = Submission {
            id: SubmissionId::new(),
            exam_id: exam.id,
            student_id: request.student_id,
            answers: request.answers.clone(),
            submitted_at: request.submitted_at,
            score: graded.score,
            outcomes: graded.outcomes,
            needs_review: graded.needs_review,
        };
        let inserted = ctx
            .store(
                "insert_submission",
                self.store.insert_submission(submission.clone()),
            )
            .await?;
        if let SubmissionInsert::Existing(stored) = inserted {
            return replay(stored, &request);
        }

        audit::record(&*self.store, ctx, AuditAction::SubmissionRecorded, submission.id).await;
        tracing::info!(
            exam = %exam.id,
            student = %submission.student_id,
            submission = %submission.id,
            needs_review = submission.needs_review,
            "submission recorded: {:.1}%",
            submission.score.percentage
        );
        Ok(submission)
    }

    /// Submissions visible to the caller, ordered by submission time.
    ///
    /// Students see only their own; a missing student filter means "mine".
    /// Teachers see submissions to exams they created. Admins see all.
    pub async fn get_results(
        &self,
        ctx: &RequestContext,
        filter: &ResultFilter,
    ) -> Result<Vec<Submission>> {
        let mut filter = *filter;
        let exam = match filter.exam_id {
            Some(id) => Some(
                ctx.store("get_exam", self.store.get_exam(id))
                    .await?
                    .ok_or_else(|| AssessmentError::not_found(EntityKind::Exam, id))?,
            ),
            None => None,
        };

        let mut own_exams: Option<HashSet<ExamId>> = None;
        match ctx.actor.role {
            Role::Admin => authorize(&ctx.actor, Operation::ViewResults(ResultScope::All))?,
            Role::Student => {
                let student = *filter.student_id.get_or_insert(ctx.actor.id);
                authorize(
                    &ctx.actor,
                    Operation::ViewResults(ResultScope::OwnSubmissions(student)),
                )?;
            }
            Role::Teacher => match &exam {
                Some(exam) => authorize(
                    &ctx.actor,
                    Operation::ViewResults(ResultScope::ExamsCreatedBy(exam.creator_id)),
                )?,
                None => {
                    authorize(
                        &ctx.actor,
                        Operation::ViewResults(ResultScope::ExamsCreatedBy(ctx.actor.id)),
                    )?;
                    own_exams = Some(self.exams_created_by(ctx, ctx.actor.id).await?);
                }
            },
        }

        let mut found = ctx
            .store("list_submissions", self.store.list_submissions(&filter))
            .await?;
        if let Some(own) = own_exams {
            found.retain(|s| own.contains(&s.exam_id));
        }
        tracing::debug!(count = found.len(), ?filter, "results listed");
        Ok(found)
    }

    async fn check_student(&self, ctx: &RequestContext, student_id: UserId) -> Result<()> {
        let student = ctx
            .store("get_user", self.store.get_user(student_id))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::User, student_id))?;
        if student.role != Role::Student {
            return Err(AssessmentError::validation(
                EntityKind::Submission,
                "student_id",
                format!("{} is a {}, not a STUDENT", student.username, student.role),
            ));
        }
        Ok(())
    }

    async fn exams_created_by(
        &self,
        ctx: &RequestContext,
        creator: UserId,
    ) -> Result<HashSet<ExamId>> {
        let exams = ctx.store("list_exams", self.store.list_exams()).await?;
        Ok(exams
            .into_iter()
            .filter(|e| e.creator_id == creator)
            .map(|e| e.id)
            .collect())
    }
}

/// Answer a retry: the stored submission if nothing changed, else a duplicate.
fn replay(stored: Submission, request: &SubmitRequest) -> Result<Submission> {
    if stored.answers == request.answers && stored.submitted_at == request.submitted_at {
        tracing::debug!(submission = %stored.id, "identical resubmission, returning stored result");
        return Ok(stored);
    }
    tracing::warn!(
        exam = %request.exam_id,
        student = %request.student_id,
        "duplicate submission rejected"
    );
    Err(AssessmentError::DuplicateSubmission {
        exam_id: request.exam_id,
        student_id: request.student_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::Actor;
    use crate::memory::MemoryStore;
    use crate::model::{AnswerOption, Exam, OptionId, Question, QuestionId, QuestionKind, User};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        store: Arc<MemoryStore>,
        engine: SubmissionEngine,
        teacher: User,
        student: User,
        exam: Exam,
        question: Question,
    }

    fn user(name: &str, role: Role) -> User {
        User {
            id: UserId::new(),
            username: name.into(),
            role,
            created_at: Utc::now(),
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 1, 9, 0, 0).unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let teacher = user("tina", Role::Teacher);
        let student = user("sam", Role::Student);
        store.put_user(teacher.clone()).await.unwrap();
        store.put_user(student.clone()).await.unwrap();

        let qid = QuestionId::new();
        let question = Question {
            id: qid,
            text: "Pick B".into(),
            kind: QuestionKind::SingleChoice,
            options: ["A", "B"]
                .iter()
                .map(|text| AnswerOption {
                    id: OptionId::new(),
                    question_id: qid,
                    text: (*text).into(),
                    is_correct: *text == "B",
                })
                .collect(),
            created_at: Utc::now(),
        };
        store.put_question(question.clone()).await.unwrap();

        let exam = Exam {
            id: ExamId::new(),
            title: "Quiz".into(),
            description: String::new(),
            start_date: start(),
            end_date: start() + Duration::hours(1),
            creator_id: teacher.id,
            question_ids: vec![qid],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.put_exam(exam.clone()).await.unwrap();

        let engine = SubmissionEngine::new(
            store.clone(),
            Arc::new(AggregateLocks::new()),
            ScoringPolicy::default(),
        );
        Fixture {
            store,
            engine,
            teacher,
            student,
            exam,
            question,
        }
    }

    impl Fixture {
        fn ctx(&self, user: &User) -> RequestContext {
            RequestContext::new(Actor::new(user.id, user.role))
        }

        fn request(&self, label: &str, minutes: i64) -> SubmitRequest {
            let option = self
                .question
                .options
                .iter()
                .find(|o| o.text == label)
                .unwrap()
                .id;
            SubmitRequest {
                exam_id: self.exam.id,
                student_id: self.student.id,
                answers: [(self.question.id, Answer::Single { option })]
                    .into_iter()
                    .collect(),
                submitted_at: start() + Duration::minutes(minutes),
            }
        }
    }

    #[tokio::test]
    async fn correct_answer_scores_full_marks() {
        let f = fixture().await;
        let submission = f
            .engine
            .submit(&f.ctx(&f.student), f.request("B", 10))
            .await
            .unwrap();
        assert_eq!(submission.score.percentage, 100.0);
        assert_eq!(submission.outcomes.len(), 1);
        assert!(!submission.needs_review);
    }

    #[tokio::test]
    async fn identical_retry_returns_stored_submission() {
        let f = fixture().await;
        let ctx = f.ctx(&f.student);
        let first = f.engine.submit(&ctx, f.request("A", 10)).await.unwrap();
        assert_eq!(first.score.percentage, 0.0);

        let again = f.engine.submit(&ctx, f.request("A", 10)).await.unwrap();
        assert_eq!(again, first);

        let err = f.engine.submit(&ctx, f.request("B", 10)).await.unwrap_err();
        assert!(matches!(err, AssessmentError::DuplicateSubmission { .. }));
        let err = f.engine.submit(&ctx, f.request("A", 11)).await.unwrap_err();
        assert!(matches!(err, AssessmentError::DuplicateSubmission { .. }));

        assert_eq!(f.store.count_submissions(f.exam.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn retry_matches_regardless_of_selection_order() {
        let f = fixture().await;
        let qid = QuestionId::new();
        let options: Vec<AnswerOption> = ["2", "3", "5"]
            .iter()
            .map(|text| AnswerOption {
                id: OptionId::new(),
                question_id: qid,
                text: (*text).into(),
                is_correct: *text != "3",
            })
            .collect();
        f.store
            .put_question(Question {
                id: qid,
                text: "Primes".into(),
                kind: QuestionKind::MultipleChoice,
                options: options.clone(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let mut exam = f.exam.clone();
        exam.question_ids = vec![qid];
        f.store.put_exam(exam).await.unwrap();

        let request = |selected: Vec<OptionId>| SubmitRequest {
            exam_id: f.exam.id,
            student_id: f.student.id,
            answers: [(qid, Answer::Multiple { options: selected })]
                .into_iter()
                .collect(),
            submitted_at: start() + Duration::minutes(5),
        };
        let ctx = f.ctx(&f.student);
        let first = f
            .engine
            .submit(&ctx, request(vec![options[2].id, options[0].id]))
            .await
            .unwrap();
        assert_eq!(first.score.percentage, 100.0);

        let again = f
            .engine
            .submit(&ctx, request(vec![options[0].id, options[2].id]))
            .await
            .unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(f.store.count_submissions(f.exam.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let f = fixture().await;
        let ctx = f.ctx(&f.student);

        let err = f.engine.submit(&ctx, f.request("B", -1)).await.unwrap_err();
        assert!(matches!(err, AssessmentError::OutOfWindow { .. }));
        let err = f.engine.submit(&ctx, f.request("B", 61)).await.unwrap_err();
        assert!(matches!(err, AssessmentError::OutOfWindow { .. }));

        f.engine.submit(&ctx, f.request("B", 60)).await.unwrap();
    }

    #[tokio::test]
    async fn out_of_window_wins_over_bad_answers() {
        let f = fixture().await;
        let mut request = f.request("B", 120);
        request.answers.clear();
        let err = f
            .engine
            .submit(&f.ctx(&f.student), request)
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::OutOfWindow { .. }));
    }

    #[tokio::test]
    async fn invalid_sheet_persists_nothing() {
        let f = fixture().await;
        let mut request = f.request("B", 5);
        request.answers.clear();
        let err = f
            .engine
            .submit(&f.ctx(&f.student), request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains(&f.question.id.to_string()));
        assert_eq!(f.store.count_submissions(f.exam.id).await.unwrap(), 0);
        assert!(f.store.list_audit().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn who_may_submit() {
        let f = fixture().await;

        let err = f
            .engine
            .submit(&f.ctx(&f.teacher), f.request("B", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::PermissionDenied { .. }));

        let other = user("olga", Role::Student);
        f.store.put_user(other.clone()).await.unwrap();
        let err = f
            .engine
            .submit(&f.ctx(&other), f.request("B", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::PermissionDenied { .. }));

        let admin = user("root", Role::Admin);
        let mut for_teacher = f.request("B", 5);
        for_teacher.student_id = f.teacher.id;
        let err = f
            .engine
            .submit(&f.ctx(&admin), for_teacher)
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::Validation { .. }));

        let mut unknown = f.request("B", 5);
        unknown.exam_id = ExamId::new();
        let err = f
            .engine
            .submit(&f.ctx(&f.student), unknown)
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::NotFound { .. }));
    }

    #[tokio::test]
    async fn results_are_scoped_by_role() {
        let f = fixture().await;
        f.engine
            .submit(&f.ctx(&f.student), f.request("B", 5))
            .await
            .unwrap();

        let mine = f
            .engine
            .get_results(&f.ctx(&f.student), &ResultFilter::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);

        let other = user("olga", Role::Student);
        let err = f
            .engine
            .get_results(&f.ctx(&other), &ResultFilter::student(f.student.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::PermissionDenied { .. }));
        let none = f
            .engine
            .get_results(&f.ctx(&other), &ResultFilter::exam(f.exam.id))
            .await
            .unwrap();
        assert!(none.is_empty());

        let by_exam = f
            .engine
            .get_results(&f.ctx(&f.teacher), &ResultFilter::exam(f.exam.id))
            .await
            .unwrap();
        assert_eq!(by_exam.len(), 1);

        let stranger = user("tom", Role::Teacher);
        let err = f
            .engine
            .get_results(&f.ctx(&stranger), &ResultFilter::exam(f.exam.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::PermissionDenied { .. }));
        let nothing = f
            .engine
            .get_results(&f.ctx(&stranger), &ResultFilter::default())
            .await
            .unwrap();
        assert!(nothing.is_empty());

        let err = f
            .engine
            .get_results(&f.ctx(&f.teacher), &ResultFilter::exam(ExamId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AssessmentError::NotFound { .. }));
    }
}
