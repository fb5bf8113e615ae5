//! Assessment error taxonomy.
//!
//! Every core operation returns [`AssessmentError`]. Callers use
//! [`AssessmentError::is_retryable`] to decide whether a request may be
//! replayed as-is.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ExamId, Role, UserId};

/// Entity families referenced by error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Exam,
    Question,
    Option,
    Submission,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Exam => write!(f, "exam"),
            EntityKind::Question => write!(f, "question"),
            EntityKind::Option => write!(f, "option"),
            EntityKind::Submission => write!(f, "submission"),
        }
    }
}

/// Failures reported by an [`EntityStore`](crate::store::EntityStore) backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend could not be reached; the call may succeed if retried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or corrupted the request.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` if the failure is transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors produced by the assessment core.
#[derive(Debug, Error)]
pub enum AssessmentError {
    /// Malformed or inconsistent input. Fix the request and resend.
    #[error("invalid {entity} {field}: {message}")]
    Validation {
        entity: EntityKind,
        field: String,
        message: String,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// The operation would break an invariant given the current state.
    #[error("conflict on {entity} {id}: {message}")]
    Conflict {
        entity: EntityKind,
        id: String,
        message: String,
    },

    /// The caller's role lacks the capability.
    #[error("permission denied: {role} may not {operation}")]
    PermissionDenied { role: Role, operation: String },

    /// The student already has a different submission for this exam.
    #[error("student {student_id} already submitted exam {exam_id}")]
    DuplicateSubmission { exam_id: ExamId, student_id: UserId },

    /// The submission time falls outside the exam window.
    #[error("submission at {submitted_at} is outside the window of exam {exam_id} ({start} .. {end})")]
    OutOfWindow {
        exam_id: ExamId,
        submitted_at: DateTime<Utc>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Lock acquisition or a store call did not finish in time.
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout { operation: String, after: Duration },

    /// The store backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AssessmentError {
    /// Returns `true` if the request can be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            AssessmentError::Timeout { .. } => true,
            AssessmentError::Store(e) => e.is_transient(),
            _ => false,
        }
    }

    pub(crate) fn validation(
        entity: EntityKind,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        AssessmentError::Validation {
            entity,
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        AssessmentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(
        entity: EntityKind,
        id: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        AssessmentError::Conflict {
            entity,
            id: id.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = AssessmentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        let timeout = AssessmentError::Timeout {
            operation: "lock exam".into(),
            after: Duration::from_millis(50),
        };
        assert!(timeout.is_retryable());
        assert!(AssessmentError::from(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!AssessmentError::from(StoreError::Backend("bad row".into())).is_retryable());
        assert!(!AssessmentError::not_found(EntityKind::Exam, "x").is_retryable());
    }

    #[test]
    fn messages_name_the_entity() {
        let err = AssessmentError::validation(EntityKind::Exam, "title", "must not be empty");
        assert_eq!(err.to_string(), "invalid exam title: must not be empty");

        let err = AssessmentError::Timeout {
            operation: "get_exam".into(),
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "get_exam timed out after 250ms");
    }
}
