//! Subcommand implementations and the plumbing they share.

pub mod audit;
pub mod exams;
pub mod init;
pub mod load;
pub mod paper;
pub mod results;
pub mod stats;
pub mod submit;
pub mod users;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use evalua_core::config::load_config_from;
use evalua_core::model::{Exam, ExamId, Role, UserId};
use evalua_core::{Actor, Assessment, RequestContext};
use evalua_store::JsonFileStore;

/// An assessment opened over a state file.
pub struct Session {
    pub assessment: Assessment,
    pub state: PathBuf,
}

impl Session {
    /// Open the state file, creating it on first write.
    pub fn open(state: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let state = state.unwrap_or_else(|| config.state_path.clone());
        let store = JsonFileStore::open(&state)
            .with_context(|| format!("failed to open state file: {}", state.display()))?;
        tracing::debug!("state file {}", state.display());
        Ok(Self {
            assessment: Assessment::new(Arc::new(store), &config),
            state,
        })
    }

    /// Like [`Session::open`], but the state file must already exist.
    pub fn open_existing(state: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let session = Self::open(state, config_path)?;
        anyhow::ensure!(
            session.state.exists(),
            "state file {} does not exist; run `evalua load` first",
            session.state.display()
        );
        Ok(session)
    }

    /// Resolve `--as <username>` to a caller.
    pub async fn act_as(&self, username: &str) -> Result<RequestContext> {
        self.assessment
            .context_for(username)
            .await
            .with_context(|| format!("cannot act as '{username}'"))
    }

    /// A caller for reads that are not role-gated.
    pub fn reader(&self) -> RequestContext {
        self.assessment
            .context(Actor::new(UserId::default(), Role::Student))
    }

    /// Find an exam by id or by its exact title.
    pub async fn find_exam(&self, ctx: &RequestContext, key: &str) -> Result<Exam> {
        if let Ok(id) = key.parse::<ExamId>() {
            return Ok(self.assessment.exams().get_exam(ctx, id).await?);
        }
        let mut matching: Vec<Exam> = self
            .assessment
            .exams()
            .list_exams(ctx)
            .await?
            .into_iter()
            .filter(|e| e.title == key.trim())
            .collect();
        match matching.len() {
            0 => anyhow::bail!("no exam titled '{key}'"),
            1 => Ok(matching.remove(0)),
            n => anyhow::bail!("{n} exams are titled '{key}'; use the exam id"),
        }
    }
}

/// Parse an optional `--at`/`--as-of` instant, defaulting to now.
pub fn instant(value: Option<&str>) -> Result<DateTime<Utc>> {
    match value {
        Some(s) => evalua_core::parser::parse_timestamp(s),
        None => Ok(Utc::now()),
    }
}

pub fn format_instant(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}
