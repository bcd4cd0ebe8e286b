//! Webhook reconciliation.
//!
//! Strictly ordered protocol:
//!
//! ```text
//! Idle -> Inspecting -> Deleting -> Settling1 -> Setting -> Settling2 -> Verifying
//!      -> Converged | ConvergedWithWarning
//! ```
//!
//! Only `Setting` can abort the run. Settling is a bounded poll of
//! `getWebhookInfo` governed by [`ConvergencePolicy`], not a fixed sleep.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::report::StatusSink;
use crate::telegram::{SetWebhookRequest, WebhookApi};
use crate::types::{WebhookConfig, WebhookState};

/// Reconciler phase, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Inspecting,
    Deleting,
    Settling1,
    Setting,
    Settling2,
    Verifying,
    Converged,
    ConvergedWithWarning,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Inspecting => "inspecting",
            Self::Deleting => "deleting",
            Self::Settling1 => "settling-after-delete",
            Self::Setting => "setting",
            Self::Settling2 => "settling-after-set",
            Self::Verifying => "verifying",
            Self::Converged => "converged",
            Self::ConvergedWithWarning => "converged-with-warning",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Bounds for waiting on remote propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePolicy {
    /// Maximum number of `getWebhookInfo` polls per settle phase.
    pub max_attempts: u32,
    /// Wait before the first poll. Doubles after each miss.
    pub initial_delay: Duration,
    /// Cap on the per-attempt wait.
    pub max_delay: Duration,
    /// Overall budget per settle phase.
    pub timeout: Duration,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
            timeout: Duration::from_secs(15),
        }
    }
}

impl ConvergencePolicy {
    /// Poll without waiting. Used by tests and local stubs.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            timeout: Duration::from_secs(60),
        }
    }
}

/// How the run ended when the subscription was installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// Remote URL matches the desired URL.
    Converged,
    /// Install succeeded but the remote URL was never observed to match.
    ConvergedWithWarning,
}

/// Outcome of a reconciliation that got past the install step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub deleted: bool,
    pub set: bool,
    pub verified: bool,
    /// Last URL observed at the remote side; empty when never observed.
    pub final_url: String,
    pub convergence: Convergence,
    pub initial_state: Option<WebhookState>,
    pub final_state: Option<WebhookState>,
}

enum PollOutcome {
    Matched(WebhookState),
    Exhausted {
        last_state: Option<WebhookState>,
        last_error: Option<String>,
    },
}

/// Drives a [`WebhookApi`] from its current state to a desired [`WebhookConfig`].
pub struct WebhookReconciler<'a, A: WebhookApi + ?Sized> {
    api: &'a A,
    sink: &'a dyn StatusSink,
    policy: ConvergencePolicy,
}

impl<'a, A: WebhookApi + ?Sized> WebhookReconciler<'a, A> {
    pub fn new(api: &'a A, sink: &'a dyn StatusSink) -> Self {
        Self {
            api,
            sink,
            policy: ConvergencePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn enter(phase: Phase) {
        debug!(phase = %phase, "Reconciler transition");
    }

    /// Run the full protocol.
    ///
    /// # Errors
    /// Returns [`ReconcileError::InstallFailed`] if `setWebhook` fails; no
    /// verification is attempted in that case.
    pub async fn reconcile(
        &self,
        desired: &WebhookConfig,
    ) -> Result<ReconciliationResult, ReconcileError> {
        Self::enter(Phase::Idle);

        Self::enter(Phase::Inspecting);
        let initial_state = self.inspect().await;

        Self::enter(Phase::Deleting);
        let deleted = self.delete().await;

        Self::enter(Phase::Settling1);
        if deleted {
            if let PollOutcome::Exhausted { last_state, .. } =
                self.poll_until(|state| !state.is_set()).await
            {
                let still = last_state.map(|s| s.current_url).unwrap_or_default();
                warn!(still_set = %still, "Webhook not observed as removed");
                self.sink
                    .warning("Webhook removal not yet visible, continuing with install");
            }
        }

        Self::enter(Phase::Setting);
        let request = SetWebhookRequest::from(desired);
        self.sink
            .info(&format!("Setting webhook: {}", desired.url()));
        if let Err(e) = self.api.set_webhook(&request).await {
            Self::enter(Phase::Aborted);
            warn!(error = %e, "setWebhook failed");
            self.sink.error(&format!("Failed to set webhook: {e}"));
            return Err(ReconcileError::InstallFailed(e));
        }
        self.sink.success("Webhook set successfully");

        Self::enter(Phase::Settling2);
        let outcome = self
            .poll_until(|state| state.current_url == desired.url())
            .await;

        Self::enter(Phase::Verifying);
        let result = match outcome {
            PollOutcome::Matched(state) => {
                Self::enter(Phase::Converged);
                self.sink
                    .success(&format!("Webhook verified: {}", state.current_url));
                self.sink
                    .info(&format!("Pending updates: {}", state.pending_update_count));
                ReconciliationResult {
                    deleted,
                    set: true,
                    verified: true,
                    final_url: state.current_url.clone(),
                    convergence: Convergence::Converged,
                    initial_state,
                    final_state: Some(state),
                }
            }
            PollOutcome::Exhausted {
                last_state,
                last_error,
            } => {
                Self::enter(Phase::ConvergedWithWarning);
                let final_url = last_state
                    .as_ref()
                    .map(|s| s.current_url.clone())
                    .unwrap_or_default();
                if let Some(error) = &last_error {
                    self.sink
                        .warning(&format!("Failed to verify webhook: {error}"));
                }
                if last_state.is_some() {
                    self.sink.warning("Webhook URL mismatch");
                    self.sink.info(&format!("Expected: {}", desired.url()));
                    self.sink.info(&format!("Got: {final_url}"));
                }
                ReconciliationResult {
                    deleted,
                    set: true,
                    verified: false,
                    final_url,
                    convergence: Convergence::ConvergedWithWarning,
                    initial_state,
                    final_state: last_state,
                }
            }
        };

        info!(
            deleted = result.deleted,
            verified = result.verified,
            convergence = ?result.convergence,
            "Webhook reconciliation finished"
        );
        Ok(result)
    }

    async fn inspect(&self) -> Option<WebhookState> {
        self.sink.info("Fetching current webhook info...");
        match self.api.get_webhook_info().await {
            Ok(state) => {
                let current = if state.is_set() {
                    state.current_url.as_str()
                } else {
                    "none"
                };
                self.sink.info(&format!("Current: {current}"));
                self.sink
                    .info(&format!("Pending updates: {}", state.pending_update_count));
                if let Some(message) = &state.last_error_message {
                    let at = state
                        .last_error_at()
                        .map(|t| t.format(" at %Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_default();
                    self.sink.warning(&format!("Last delivery error{at}: {message}"));
                }
                Some(state)
            }
            Err(e) => {
                warn!(error = %e, "getWebhookInfo failed");
                self.sink
                    .warning(&format!("Failed to get webhook info: {e}"));
                None
            }
        }
    }

    async fn delete(&self) -> bool {
        self.sink.info("Deleting existing webhook...");
        match self.api.delete_webhook(true).await {
            Ok(()) => {
                self.sink.success("Webhook deleted");
                true
            }
            Err(e) => {
                warn!(error = %e, "deleteWebhook failed");
                self.sink.warning(&format!("Failed to delete webhook: {e}"));
                false
            }
        }
    }

    /// Poll `getWebhookInfo` until `predicate` holds or the policy runs out.
    async fn poll_until<F>(&self, predicate: F) -> PollOutcome
    where
        F: Fn(&WebhookState) -> bool + Send + Sync,
    {
        let started = Instant::now();
        let mut delay = self.policy.initial_delay;
        let mut last_state = None;
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts.max(1) {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.api.get_webhook_info().await {
                Ok(state) if predicate(&state) => {
                    debug!(attempt, "Remote state converged");
                    return PollOutcome::Matched(state);
                }
                Ok(state) => {
                    debug!(attempt, url = %state.current_url, "Remote state not converged yet");
                    last_state = Some(state);
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Poll failed");
                    last_error = Some(e.to_string());
                }
            }

            if started.elapsed() >= self.policy.timeout {
                debug!(attempt, "Convergence timeout reached");
                break;
            }
            delay = (delay * 2).min(self.policy.max_delay);
        }

        PollOutcome::Exhausted {
            last_state,
            last_error,
        }
    }
}
