//! The reset sequence: drain backlog tables, then reconcile the webhook.
//!
//! Draining always finishes before the webhook is reinstalled so a fresh
//! subscription never delivers into a half-cleared queue.

use thiserror::Error;
use tracing::info;

use crate::drain::{all_verified_empty, DrainReport, QueueDrainer};
use crate::error::ReconcileError;
use crate::reconcile::{Convergence, ConvergencePolicy, ReconciliationResult, WebhookReconciler};
use crate::report::StatusSink;
use crate::store::BacklogStore;
use crate::telegram::WebhookApi;
use crate::types::{TableName, WebhookConfig};

/// Fatal outcome of a reset run.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Strict mode: install succeeded but convergence was not observed.
    #[error("Webhook not verified: expected {expected}, observed '{observed}'")]
    NotVerified { expected: String, observed: String },
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub drain: Vec<DrainReport>,
    pub reconciliation: Option<ReconciliationResult>,
}

impl RunSummary {
    /// True when nothing needs operator attention.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        all_verified_empty(&self.drain)
            && self
                .reconciliation
                .as_ref()
                .is_none_or(|r| r.convergence == Convergence::Converged)
    }
}

/// Process exit status for a command result: 0 on success, 1 on any fatal
/// error. Warnings never change the status.
#[must_use]
pub fn exit_code<T, E>(result: &Result<T, E>) -> u8 {
    u8::from(result.is_err())
}

/// Drain-then-reconcile runner.
pub struct ResetFlow<'a> {
    api: &'a dyn WebhookApi,
    store: Option<&'a dyn BacklogStore>,
    sink: &'a dyn StatusSink,
    policy: ConvergencePolicy,
    strict_verify: bool,
}

impl<'a> ResetFlow<'a> {
    pub fn new(api: &'a dyn WebhookApi, sink: &'a dyn StatusSink) -> Self {
        Self {
            api,
            store: None,
            sink,
            policy: ConvergencePolicy::default(),
            strict_verify: false,
        }
    }

    /// Drain through `store` before reconciling. Without a store the drain
    /// step is skipped.
    #[must_use]
    pub fn with_store(mut self, store: &'a dyn BacklogStore) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Treat [`Convergence::ConvergedWithWarning`] as a failure.
    #[must_use]
    pub fn strict_verify(mut self, strict: bool) -> Self {
        self.strict_verify = strict;
        self
    }

    /// Run the full sequence.
    ///
    /// # Errors
    /// Returns [`FlowError`] if the webhook install fails, or in strict mode
    /// if convergence was not observed.
    pub async fn run(
        &self,
        desired: &WebhookConfig,
        tables: &[TableName],
    ) -> Result<RunSummary, FlowError> {
        let mut summary = RunSummary::default();

        if let Some(store) = self.store {
            self.sink.step(2, 4, "Resetting backlog tables");
            summary.drain = QueueDrainer::new(store, self.sink).drain(tables).await;
        } else {
            self.sink.step(2, 4, "Skipping backlog tables");
        }

        self.sink.step(3, 4, "Managing Telegram webhook");
        let result = WebhookReconciler::new(self.api, self.sink)
            .with_policy(self.policy)
            .reconcile(desired)
            .await?;

        if self.strict_verify && result.convergence != Convergence::Converged {
            return Err(FlowError::NotVerified {
                expected: desired.url().to_string(),
                observed: result.final_url,
            });
        }

        info!(
            tables = summary.drain.len(),
            convergence = ?result.convergence,
            "Reset finished"
        );
        summary.reconciliation = Some(result);
        Ok(summary)
    }
}
