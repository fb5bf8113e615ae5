//! Dashboard statistics and the audit log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::AuditEntry;
use crate::context::RequestContext;
use crate::error::{AssessmentError, EntityKind, Result};
use crate::guard::{authorize, Operation, ResultScope};
use crate::model::{ExamId, Submission};
use crate::store::{EntityStore, ResultFilter};

/// System-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_exams: usize,
    pub total_users: usize,
    pub total_submissions: usize,
    /// Mean percentage over all submissions, 0 when there are none.
    pub average_percentage: f64,
}

/// Score distribution of one exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub exam_id: ExamId,
    pub submissions: usize,
    pub mean_percentage: f64,
    pub best_percentage: f64,
    pub worst_percentage: f64,
    /// Submissions holding answers that wait for manual grading.
    pub awaiting_review: usize,
}

/// Mean of the submissions' percentages.
pub fn average_percentage(submissions: &[Submission]) -> f64 {
    if submissions.is_empty() {
        return 0.0;
    }
    let total: f64 = submissions.iter().map(|s| s.score.percentage).sum();
    total / submissions.len() as f64
}

/// Summarize one exam's submissions.
pub fn summarize(exam_id: ExamId, submissions: &[Submission]) -> ExamSummary {
    let percentages = submissions.iter().map(|s| s.score.percentage);
    ExamSummary {
        exam_id,
        submissions: submissions.len(),
        mean_percentage: average_percentage(submissions),
        best_percentage: percentages.clone().fold(0.0, f64::max),
        worst_percentage: if submissions.is_empty() {
            0.0
        } else {
            percentages.fold(f64::INFINITY, f64::min)
        },
        awaiting_review: submissions.iter().filter(|s| s.needs_review).count(),
    }
}

/// Read-only reports over the store.
pub struct Reporting {
    store: Arc<dyn EntityStore>,
}

impl Reporting {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn stats(&self, ctx: &RequestContext) -> Result<DashboardStats> {
        authorize(&ctx.actor, Operation::ViewStats)?;
        let exams = ctx.store("list_exams", self.store.list_exams()).await?;
        let users = ctx.store("list_users", self.store.list_users()).await?;
        let submissions = ctx
            .store(
                "list_submissions",
                self.store.list_submissions(&ResultFilter::default()),
            )
            .await?;
        Ok(DashboardStats {
            total_exams: exams.len(),
            total_users: users.len(),
            total_submissions: submissions.len(),
            average_percentage: average_percentage(&submissions),
        })
    }

    /// Score distribution for an exam, visible to its creator and admins.
    pub async fn exam_summary(&self, ctx: &RequestContext, exam_id: ExamId) -> Result<ExamSummary> {
        let exam = ctx
            .store("get_exam", self.store.get_exam(exam_id))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Exam, exam_id))?;
        authorize(
            &ctx.actor,
            Operation::ViewResults(ResultScope::ExamsCreatedBy(exam.creator_id)),
        )?;
        let submissions = ctx
            .store(
                "list_submissions",
                self.store.list_submissions(&ResultFilter::exam(exam_id)),
            )
            .await?;
        Ok(summarize(exam_id, &submissions))
    }

    /// Audit entries in append order.
    pub async fn audit_log(&self, ctx: &RequestContext) -> Result<Vec<AuditEntry>> {
        authorize(&ctx.actor, Operation::ViewAuditLog)?;
        ctx.store("list_audit", self.store.list_audit()).await
    }
}
