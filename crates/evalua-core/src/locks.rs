//! Per-aggregate async locks.
//!
//! Acquisition order is exam, then questions, then users, then attempts.
//! Every operation that holds more than one lock follows it, so two
//! operations can never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::error::{AssessmentError, Result};
use crate::model::{ExamId, QuestionId, UserId};

/// A lockable aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    Exam(ExamId),
    Question(QuestionId),
    User(UserId),
    /// Guards role changes that depend on the set of all users.
    Roster,
    /// One student's attempt at one exam.
    Attempt(ExamId, UserId),
}

enum Held {
    #[allow(dead_code)]
    Read(OwnedRwLockReadGuard<()>),
    #[allow(dead_code)]
    Write(OwnedRwLockWriteGuard<()>),
}

/// Registry of lock slots, created on demand and dropped when unused.
#[derive(Default)]
pub struct AggregateLocks {
    slots: Mutex<HashMap<LockKey, Arc<RwLock<()>>>>,
}

impl AggregateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: LockKey) -> Arc<RwLock<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        Arc::clone(slots.entry(key).or_default())
    }

    /// Number of slots currently held by someone.
    pub fn active(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|s| Arc::strong_count(s) > 1).count()
    }

    /// Start collecting guards with the given acquisition budget.
    pub fn session(self: &Arc<Self>, timeout: Duration) -> LockSet {
        LockSet {
            locks: Arc::clone(self),
            timeout,
            held: Vec::new(),
        }
    }
}

/// Guards held by one operation; released together on drop.
pub struct LockSet {
    locks: Arc<AggregateLocks>,
    timeout: Duration,
    held: Vec<Held>,
}

impl LockSet {
    /// Take a shared lock on `key`.
    pub async fn read(&mut self, key: LockKey) -> Result<()> {
        let slot = self.locks.slot(key);
        let guard = tokio::time::timeout(self.timeout, slot.read_owned())
            .await
            .map_err(|_| self.timed_out(key))?;
        self.held.push(Held::Read(guard));
        Ok(())
    }

    /// Take an exclusive lock on `key`.
    pub async fn write(&mut self, key: LockKey) -> Result<()> {
        let slot = self.locks.slot(key);
        let guard = tokio::time::timeout(self.timeout, slot.write_owned())
            .await
            .map_err(|_| self.timed_out(key))?;
        self.held.push(Held::Write(guard));
        Ok(())
    }

    /// Take shared locks on several keys in a stable order.
    pub async fn read_all(&mut self, keys: impl IntoIterator<Item = LockKey>) -> Result<()> {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            self.read(key).await?;
        }
        Ok(())
    }

    fn timed_out(&self, key: LockKey) -> AssessmentError {
        tracing::warn!(?key, "lock wait exceeded {}ms", self.timeout.as_millis());
        AssessmentError::Timeout {
            operation: format!("lock {key:?}"),
            after: self.timeout,
        }
    }
}
