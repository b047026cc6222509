//! Tracks a submitted transaction until it is confirmed, fails, or times out.
//!
//! Only `confirmed` or `finalized` counts as success. A `processed` status
//! means the leader executed the transaction, but the accounts it created may
//! not be readable from every RPC replica yet.

use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::SyncError;
use crate::infra::config::SyncConfig;
use crate::infra::solana::{Ledger, SignatureStatus};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);
// About 30 years; stands in for an unrepresentable deadline.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WatchPolicy {
    pub fn confirmation(config: &SyncConfig) -> Self {
        Self {
            timeout: config.confirmation_timeout,
            poll_interval: config.poll_interval,
        }
    }

    pub fn bootstrap(config: &SyncConfig) -> Self {
        Self {
            timeout: config.bootstrap_timeout,
            poll_interval: config.poll_interval,
        }
    }
}

/// Progress of one watched transaction. Moves forward only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationState {
    Pending,
    ExecutionFailed(String),
    Confirmed,
    TimedOut,
}

impl ConfirmationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationState::Pending)
    }

    /// Folds one status observation into the state.
    pub fn observe(self, status: &SignatureStatus) -> Self {
        if self.is_terminal() {
            return self;
        }
        match status {
            SignatureStatus::Failed(detail) => ConfirmationState::ExecutionFailed(detail.clone()),
            SignatureStatus::Confirmed | SignatureStatus::Finalized => ConfirmationState::Confirmed,
            SignatureStatus::Unknown | SignatureStatus::Processed => ConfirmationState::Pending,
        }
    }

    pub fn expire(self) -> Self {
        if self.is_terminal() {
            self
        } else {
            ConfirmationState::TimedOut
        }
    }
}

#[derive(Clone)]
pub struct ConfirmationWatcher {
    ledger: Arc<dyn Ledger>,
}

impl ConfirmationWatcher {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Polls until a terminal state. Never returns `Pending`.
    ///
    /// Status-query errors are logged and retried until the deadline; each
    /// query is itself bounded by the time left.
    pub async fn watch(&self, signature: &Signature, policy: WatchPolicy) -> ConfirmationState {
        let started = Instant::now();
        let deadline = started
            .checked_add(policy.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut ticker = tokio::time::interval(policy.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = ConfirmationState::Pending;
        let mut polls: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = tokio::time::sleep_until(deadline) => {
                    state = state.expire();
                    break;
                }
                _ = ticker.tick() => {}
            }

            polls += 1;
            match tokio::time::timeout_at(deadline, self.ledger.get_signature_status(signature))
                .await
            {
                Err(_) => state = state.expire(),
                Ok(Err(e)) => {
                    tracing::debug!(signature = %signature, error = %e, "status query failed, retrying");
                }
                Ok(Ok(status)) => state = state.observe(&status),
            }
            if state.is_terminal() {
                break;
            }
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &state {
            ConfirmationState::Confirmed => {
                tracing::info!(signature = %signature, elapsed_ms, polls, "transaction confirmed")
            }
            ConfirmationState::ExecutionFailed(detail) => {
                tracing::warn!(signature = %signature, elapsed_ms, detail = %detail, "transaction failed")
            }
            ConfirmationState::TimedOut => {
                tracing::warn!(signature = %signature, elapsed_ms, polls, "confirmation timed out")
            }
            ConfirmationState::Pending => {}
        }
        state
    }

    /// `watch`, with non-success outcomes turned into errors.
    pub async fn await_confirmation(
        &self,
        signature: &Signature,
        policy: WatchPolicy,
    ) -> Result<(), SyncError> {
        match self.watch(signature, policy).await {
            ConfirmationState::Confirmed => Ok(()),
            ConfirmationState::ExecutionFailed(detail) => Err(SyncError::ExecutionFailed {
                signature: signature.to_string(),
                detail,
            }),
            ConfirmationState::TimedOut | ConfirmationState::Pending => Err(SyncError::Timeout {
                signature: signature.to_string(),
                waited: policy.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_is_not_terminal() {
        let state = ConfirmationState::Pending.observe(&SignatureStatus::Processed);
        assert_eq!(state, ConfirmationState::Pending);
        assert_eq!(
            state.observe(&SignatureStatus::Finalized),
            ConfirmationState::Confirmed
        );
    }

    #[test]
    fn terminal_states_never_move_back() {
        let confirmed = ConfirmationState::Confirmed;
        assert_eq!(
            confirmed.clone().observe(&SignatureStatus::Unknown),
            ConfirmationState::Confirmed
        );
        assert_eq!(confirmed.expire(), ConfirmationState::Confirmed);

        let failed = ConfirmationState::Pending.observe(&SignatureStatus::Failed("boom".into()));
        assert_eq!(
            failed.observe(&SignatureStatus::Confirmed),
            ConfirmationState::ExecutionFailed("boom".into())
        );
        assert_eq!(ConfirmationState::Pending.expire(), ConfirmationState::TimedOut);
    }
}
