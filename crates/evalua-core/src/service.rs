//! Wiring of the assessment components over one store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EvaluaConfig;
use crate::context::RequestContext;
use crate::engine::SubmissionEngine;
use crate::error::{AssessmentError, EntityKind, Result};
use crate::exams::{ExamLifecycle, NewExam};
use crate::guard::{authorize, Actor, Operation};
use crate::locks::AggregateLocks;
use crate::model::{QuestionId, Role, UserId};
use crate::parser::Catalog;
use crate::questions::QuestionBank;
use crate::statistics::Reporting;
use crate::store::EntityStore;
use crate::users::UserDirectory;

/// What [`Assessment::import_catalog`] created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub users_created: usize,
    /// Catalog users that already existed and were left untouched.
    pub users_existing: usize,
    pub questions_created: usize,
    pub exams_created: usize,
}

/// All components sharing one store and one lock registry.
pub struct Assessment {
    store: Arc<dyn EntityStore>,
    timeout: Duration,
    exams: ExamLifecycle,
    questions: QuestionBank,
    engine: SubmissionEngine,
    users: UserDirectory,
    reporting: Reporting,
}

impl Assessment {
    pub fn new(store: Arc<dyn EntityStore>, config: &EvaluaConfig) -> Self {
        let locks = Arc::new(AggregateLocks::new());
        Self {
            exams: ExamLifecycle::new(store.clone(), locks.clone()),
            questions: QuestionBank::new(store.clone(), locks.clone()),
            engine: SubmissionEngine::new(store.clone(), locks.clone(), config.scoring),
            users: UserDirectory::new(store.clone(), locks),
            reporting: Reporting::new(store.clone()),
            timeout: config.store_timeout(),
            store,
        }
    }

    /// Replace the submission engine, e.g. to install an open text grader.
    pub fn with_engine(mut self, engine: SubmissionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn exams(&self) -> &ExamLifecycle {
        &self.exams
    }

    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    pub fn engine(&self) -> &SubmissionEngine {
        &self.engine
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn reporting(&self) -> &Reporting {
        &self.reporting
    }

    /// A context for `actor` with the configured timeout.
    pub fn context(&self, actor: Actor) -> RequestContext {
        RequestContext::new(actor).with_timeout(self.timeout)
    }

    /// Resolve `username` to a context acting as that user.
    pub async fn context_for(&self, username: &str) -> Result<RequestContext> {
        let probe = self.context(Actor::new(UserId::default(), Role::Student));
        let user = self.users.find_by_username(&probe, username).await?;
        Ok(self.context(Actor::new(user.id, user.role)))
    }

    /// Create the catalog's first ADMIN in an empty store and act as them.
    pub async fn bootstrap(&self, catalog: &Catalog) -> Result<RequestContext> {
        let Some(admin) = catalog.users.iter().find(|u| u.role == Role::Admin) else {
            return Err(AssessmentError::validation(
                EntityKind::User,
                "role",
                "catalog has no ADMIN to bootstrap the store with",
            ));
        };
        let probe = self.context(Actor::new(UserId::default(), Role::Admin));
        let user = self.users.bootstrap_admin(&probe, &admin.username).await?;
        Ok(self.context(Actor::new(user.id, user.role)))
    }

    /// Create everything a catalog describes.
    ///
    /// Users that already exist by username are kept as they are. Each entity
    /// is created through the regular operations, so a failure part way
    /// leaves the entities created before it in place.
    pub async fn import_catalog(
        &self,
        ctx: &RequestContext,
        catalog: &Catalog,
    ) -> Result<ImportSummary> {
        authorize(&ctx.actor, Operation::ManageUsers)?;
        let mut summary = ImportSummary::default();

        for entry in &catalog.users {
            match self.users.find_by_username(ctx, &entry.username).await {
                Ok(existing) => {
                    if existing.role != entry.role {
                        tracing::warn!(
                            "user {} exists as {}, catalog says {}; keeping {}",
                            existing.username,
                            existing.role,
                            entry.role,
                            existing.role
                        );
                    }
                    summary.users_existing += 1;
                }
                Err(AssessmentError::NotFound { .. }) => {
                    self.users
                        .create_user(ctx, &entry.username, entry.role)
                        .await?;
                    summary.users_created += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let mut keys: HashMap<&str, QuestionId> = HashMap::new();
        for entry in &catalog.questions {
            if keys.contains_key(entry.key.as_str()) {
                return Err(AssessmentError::validation(
                    EntityKind::Question,
                    "key",
                    format!("duplicate question key: {}", entry.key),
                ));
            }
            let question = self
                .questions
                .create_question(ctx, entry.question.clone())
                .await?;
            keys.insert(entry.key.as_str(), question.id);
            summary.questions_created += 1;
        }

        for entry in &catalog.exams {
            let creator = self.users.find_by_username(ctx, &entry.creator).await?;
            let question_ids = entry
                .questions
                .iter()
                .map(|key| {
                    keys.get(key.as_str()).copied().ok_or_else(|| {
                        AssessmentError::validation(
                            EntityKind::Exam,
                            "question_ids",
                            format!("exam '{}' refers to unknown question key {key}", entry.title),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            self.exams
                .create_exam(
                    ctx,
                    NewExam {
                        title: entry.title.clone(),
                        description: entry.description.clone(),
                        start_date: entry.start_date,
                        end_date: entry.end_date,
                        creator_id: creator.id,
                        question_ids,
                    },
                )
                .await?;
            summary.exams_created += 1;
        }

        tracing::info!(
            users = summary.users_created,
            questions = summary.questions_created,
            exams = summary.exams_created,
            "catalog imported"
        );
        Ok(summary)
    }
}
