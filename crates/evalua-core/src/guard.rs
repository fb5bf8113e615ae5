//! Role-based authorization decisions.
//!
//! The guard is pure: it looks only at the already-resolved [`Actor`] and the
//! requested [`Operation`], never at the store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AssessmentError, Result};
use crate::model::{Role, UserId};

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Which results a read would expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultScope {
    /// Every submission in the system.
    All,
    /// Submissions to exams created by this user.
    ExamsCreatedBy(UserId),
    /// Submissions made by this student.
    OwnSubmissions(UserId),
}

/// Capabilities checked by [`permit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateExam,
    EditExam,
    DeleteExam,
    CreateQuestion,
    EditQuestion,
    DeleteQuestion,
    ViewResults(ResultScope),
    TakeExam,
    ManageUsers,
    ViewStats,
    ViewAuditLog,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateExam => write!(f, "create exams"),
            Operation::EditExam => write!(f, "edit exams"),
            Operation::DeleteExam => write!(f, "delete exams"),
            Operation::CreateQuestion => write!(f, "create questions"),
            Operation::EditQuestion => write!(f, "edit questions"),
            Operation::DeleteQuestion => write!(f, "delete questions"),
            Operation::ViewResults(ResultScope::All) => write!(f, "view all results"),
            Operation::ViewResults(ResultScope::ExamsCreatedBy(id)) => {
                write!(f, "view results of exams created by {id}")
            }
            Operation::ViewResults(ResultScope::OwnSubmissions(id)) => {
                write!(f, "view results of student {id}")
            }
            Operation::TakeExam => write!(f, "take exams"),
            Operation::ManageUsers => write!(f, "manage users"),
            Operation::ViewStats => write!(f, "view statistics"),
            Operation::ViewAuditLog => write!(f, "view the audit log"),
        }
    }
}

/// Decide whether `actor` may perform `operation`.
pub fn permit(actor: &Actor, operation: &Operation) -> bool {
    use Operation::*;

    match (actor.role, operation) {
        (Role::Admin, _) => true,
        (
            Role::Teacher,
            CreateExam | EditExam | DeleteExam | CreateQuestion | EditQuestion | DeleteQuestion
            | ViewStats,
        ) => true,
        (Role::Teacher, ViewResults(ResultScope::ExamsCreatedBy(creator))) => *creator == actor.id,
        (Role::Student, TakeExam) => true,
        (Role::Student, ViewResults(ResultScope::OwnSubmissions(student))) => {
            *student == actor.id
        }
        _ => false,
    }
}

/// Like [`permit`], but fails with `PermissionDenied`.
pub fn authorize(actor: &Actor, operation: Operation) -> Result<()> {
    if permit(actor, &operation) {
        return Ok(());
    }
    tracing::warn!(actor = %actor.id, role = %actor.role, "denied: {operation}");
    Err(AssessmentError::PermissionDenied {
        role: actor.role,
        operation: operation.to_string(),
    })
}
