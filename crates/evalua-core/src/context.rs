//! Per-request context and bounded store access.

use std::future::Future;
use std::time::Duration;

use crate::error::{AssessmentError, Result, StoreError};
use crate::guard::Actor;

/// Default time budget for a single store call or lock acquisition.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a core operation needs to know about its caller.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub actor: Actor,
    /// Budget for each store call and each lock acquisition.
    pub timeout: Duration,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a store call, failing with `Timeout` once the budget is spent.
    pub(crate) async fn store<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| {
                tracing::warn!("store call {operation} failed: {e}");
                AssessmentError::from(e)
            }),
            Err(_) => {
                tracing::warn!(
                    "store call {operation} timed out after {}ms",
                    self.timeout.as_millis()
                );
                Err(AssessmentError::Timeout {
                    operation: operation.to_string(),
                    after: self.timeout,
                })
            }
        }
    }
}
