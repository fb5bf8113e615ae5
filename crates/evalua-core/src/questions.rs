//! Question and option authoring.
//!
//! A question and its options are validated and written as one aggregate.
//! Questions used by an exam that already has submissions are frozen, and a
//! question referenced by any exam cannot be deleted.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::audit::{self, AuditAction};
use crate::context::RequestContext;
use crate::error::{AssessmentError, EntityKind, Result};
use crate::guard::{authorize, Operation};
use crate::locks::{AggregateLocks, LockKey};
use crate::model::{AnswerOption, Exam, OptionId, Question, QuestionId, QuestionKind};
use crate::store::EntityStore;

/// An option to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOption {
    pub text: String,
    #[serde(default, alias = "correct")]
    pub is_correct: bool,
}

impl NewOption {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

/// A question to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub text: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<NewOption>,
}

/// Field-level question edit. `options` replaces the whole option list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<NewOption>>,
}

/// Field-level option edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub is_correct: Option<bool>,
}

impl NewQuestion {
    /// Assign ids to the draft without validating it.
    pub fn build(self) -> Question {
        let id = QuestionId::new();
        Question {
            id,
            text: self.text.trim().to_string(),
            kind: self.kind,
            options: build_options(id, self.options),
            created_at: Utc::now(),
        }
    }
}

fn build_options(question_id: QuestionId, drafts: Vec<NewOption>) -> Vec<AnswerOption> {
    drafts
        .into_iter()
        .map(|d| AnswerOption {
            id: OptionId::new(),
            question_id,
            text: d.text.trim().to_string(),
            is_correct: d.is_correct,
        })
        .collect()
}

/// Check a question aggregate against its kind's rules.
pub fn validate_question(question: &Question) -> Result<()> {
    let invalid = |field: &str, message: String| {
        AssessmentError::validation(EntityKind::Question, field, message)
    };

    if question.text.trim().is_empty() {
        return Err(invalid("text", "must not be empty".into()));
    }
    for option in &question.options {
        if option.text.trim().is_empty() {
            return Err(AssessmentError::validation(
                EntityKind::Option,
                "text",
                format!("option {} has empty text", option.id),
            ));
        }
        if option.question_id != question.id {
            return Err(AssessmentError::validation(
                EntityKind::Option,
                "question_id",
                format!("option {} belongs to question {}", option.id, option.question_id),
            ));
        }
    }

    let correct = question.options.iter().filter(|o| o.is_correct).count();
    match question.kind {
        QuestionKind::OpenText => {
            if !question.options.is_empty() {
                return Err(invalid(
                    "options",
                    "open text questions take no options".into(),
                ));
            }
        }
        QuestionKind::SingleChoice | QuestionKind::MultipleChoice
            if question.options.len() < 2 =>
        {
            return Err(invalid(
                "options",
                format!("{} questions need at least 2 options", question.kind),
            ));
        }
        QuestionKind::SingleChoice => {
            if correct != 1 {
                return Err(invalid(
                    "options",
                    format!("single choice questions need exactly 1 correct option, found {correct}"),
                ));
            }
        }
        QuestionKind::MultipleChoice => {
            if correct == 0 {
                return Err(invalid(
                    "options",
                    "multiple choice questions need at least 1 correct option".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Authoring operations for questions and their options.
pub struct QuestionBank {
    store: Arc<dyn EntityStore>,
    locks: Arc<AggregateLocks>,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn EntityStore>, locks: Arc<AggregateLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn create_question(&self, ctx: &RequestContext, draft: NewQuestion) -> Result<Question> {
        authorize(&ctx.actor, Operation::CreateQuestion)?;

        let question = draft.build();
        let id = question.id;
        validate_question(&question)?;

        ctx.store("put_question", self.store.put_question(question.clone()))
            .await?;
        audit::record(&*self.store, ctx, AuditAction::QuestionCreated, id).await;
        tracing::info!(question = %id, kind = %question.kind, "question created");
        Ok(question)
    }

    pub async fn get_question(&self, ctx: &RequestContext, id: QuestionId) -> Result<Question> {
        authorize(&ctx.actor, Operation::EditQuestion)?;
        self.load(ctx, id).await
    }

    pub async fn list_questions(&self, ctx: &RequestContext) -> Result<Vec<Question>> {
        authorize(&ctx.actor, Operation::EditQuestion)?;
        ctx.store("list_questions", self.store.list_questions()).await
    }

    pub async fn update_question(
        &self,
        ctx: &RequestContext,
        id: QuestionId,
        patch: QuestionPatch,
    ) -> Result<Question> {
        authorize(&ctx.actor, Operation::EditQuestion)?;
        self.modify(ctx, id, move |question| {
            if let Some(text) = patch.text {
                question.text = text.trim().to_string();
            }
            if let Some(options) = patch.options {
                question.options = build_options(question.id, options);
            }
            Ok(())
        })
        .await
        .map(|(question, ())| question)
    }

    pub async fn add_option(
        &self,
        ctx: &RequestContext,
        question_id: QuestionId,
        draft: NewOption,
    ) -> Result<AnswerOption> {
        authorize(&ctx.actor, Operation::EditQuestion)?;
        let (_, option) = self
            .modify(ctx, question_id, move |question| {
                let option = build_options(question.id, vec![draft]).remove(0);
                question.options.push(option.clone());
                Ok(option)
            })
            .await?;
        Ok(option)
    }

    pub async fn update_option(
        &self,
        ctx: &RequestContext,
        question_id: QuestionId,
        option_id: OptionId,
        patch: OptionPatch,
    ) -> Result<AnswerOption> {
        authorize(&ctx.actor, Operation::EditQuestion)?;
        let (_, option) = self
            .modify(ctx, question_id, move |question| {
                let option = question
                    .options
                    .iter_mut()
                    .find(|o| o.id == option_id)
                    .ok_or_else(|| AssessmentError::not_found(EntityKind::Option, option_id))?;
                if let Some(text) = patch.text {
                    option.text = text.trim().to_string();
                }
                if let Some(is_correct) = patch.is_correct {
                    option.is_correct = is_correct;
                }
                Ok(option.clone())
            })
            .await?;
        Ok(option)
    }

    pub async fn delete_option(
        &self,
        ctx: &RequestContext,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<()> {
        authorize(&ctx.actor, Operation::EditQuestion)?;
        self.modify(ctx, question_id, move |question| {
            let before = question.options.len();
            question.options.retain(|o| o.id != option_id);
            if question.options.len() == before {
                return Err(AssessmentError::not_found(EntityKind::Option, option_id));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    pub async fn delete_question(&self, ctx: &RequestContext, id: QuestionId) -> Result<()> {
        authorize(&ctx.actor, Operation::DeleteQuestion)?;

        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::Question(id)).await?;
        self.load(ctx, id).await?;

        let exams = self.referencing_exams(ctx, id).await?;
        if let Some(exam) = exams.first() {
            return Err(AssessmentError::conflict(
                EntityKind::Question,
                id,
                format!("still used by exam {} ({})", exam.id, exam.title),
            ));
        }

        ctx.store("delete_question", self.store.delete_question(id))
            .await?;
        audit::record(&*self.store, ctx, AuditAction::QuestionDeleted, id).await;
        tracing::info!(question = %id, "question deleted");
        Ok(())
    }

    async fn load(&self, ctx: &RequestContext, id: QuestionId) -> Result<Question> {
        ctx.store("get_question", self.store.get_question(id))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::Question, id))
    }

    async fn referencing_exams(&self, ctx: &RequestContext, id: QuestionId) -> Result<Vec<Exam>> {
        let exams = ctx.store("list_exams", self.store.list_exams()).await?;
        Ok(exams
            .into_iter()
            .filter(|e| e.question_ids.contains(&id))
            .collect())
    }

    /// Apply `edit` to a copy of the question and store it only if the
    /// result is still valid.
    async fn modify<T, F>(&self, ctx: &RequestContext, id: QuestionId, edit: F) -> Result<(Question, T)>
    where
        F: FnOnce(&mut Question) -> Result<T>,
    {
        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::Question(id)).await?;

        let current = self.load(ctx, id).await?;
        for exam in self.referencing_exams(ctx, id).await? {
            let taken = ctx
                .store("count_submissions", self.store.count_submissions(exam.id))
                .await?;
            if taken > 0 {
                return Err(AssessmentError::conflict(
                    EntityKind::Question,
                    id,
                    format!("exam {} already has submissions", exam.id),
                ));
            }
        }

        let mut updated = current.clone();
        let extra = edit(&mut updated)?;
        validate_question(&updated)?;
        if updated == current {
            return Ok((current, extra));
        }

        ctx.store("put_question", self.store.put_question(updated.clone()))
            .await?;
        audit::record(&*self.store, ctx, AuditAction::QuestionUpdated, id).await;
        tracing::info!(question = %id, "question updated");
        Ok((updated, extra))
    }
}
