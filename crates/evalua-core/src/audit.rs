//! Append-only audit trail of successful mutations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::model::UserId;
use crate::store::EntityStore;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ExamCreated,
    ExamUpdated,
    ExamDeleted,
    QuestionsAttached,
    QuestionCreated,
    QuestionUpdated,
    QuestionDeleted,
    SubmissionRecorded,
    UserCreated,
    RoleChanged,
    UserDeleted,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditAction::ExamCreated => "exam_created",
            AuditAction::ExamUpdated => "exam_updated",
            AuditAction::ExamDeleted => "exam_deleted",
            AuditAction::QuestionsAttached => "questions_attached",
            AuditAction::QuestionCreated => "question_created",
            AuditAction::QuestionUpdated => "question_updated",
            AuditAction::QuestionDeleted => "question_deleted",
            AuditAction::SubmissionRecorded => "submission_recorded",
            AuditAction::UserCreated => "user_created",
            AuditAction::RoleChanged => "role_changed",
            AuditAction::UserDeleted => "user_deleted",
        };
        f.write_str(s)
    }
}

/// One audit log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub actor_id: UserId,
    pub action: AuditAction,
    /// Id of the affected entity.
    pub target: String,
}

/// Append an entry for a mutation that already committed.
///
/// A failed append is logged and swallowed: the mutation itself stands.
pub(crate) async fn record(
    store: &dyn EntityStore,
    ctx: &RequestContext,
    action: AuditAction,
    target: impl fmt::Display,
) {
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        at: Utc::now(),
        actor_id: ctx.actor.id,
        action,
        target: target.to_string(),
    };
    if let Err(e) = ctx.store("append_audit", store.append_audit(entry)).await {
        tracing::warn!("audit entry {action} for {} not recorded: {e}", ctx.actor.id);
    }
}
