//! Error taxonomy shared by every component of the synchronization engine.
//!
//! Components return these to their caller instead of logging and swallowing;
//! the only failure absorbed locally is the benign bootstrap collision (see
//! `app::bootstrap`).

use std::time::Duration;
use thiserror::Error;

use crate::infra::solana::LedgerError;

/// Coarse classification the calling layer uses to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed caller input. Reject, never retry.
    Input,
    /// An account the operation depends on does not exist yet.
    NotYetAvailable,
    /// The on-chain program rejected the transaction.
    ExecutionFailure,
    /// Outcome unknown within the deadline; a later status check may succeed.
    Timeout,
    /// Deployment configuration is missing or invalid.
    Configuration,
    /// The ledger endpoint could not be reached.
    Transport,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("invalid address '{value}': {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("invalid program id '{0}'")]
    InvalidProgramId(String),

    #[error("invalid seed encoding: {0}")]
    InvalidSeedEncoding(String),

    #[error("failed to decode transaction: {0}")]
    DecodeFailure(String),

    #[error("invalid instruction parameters: {0}")]
    InvalidInstructionParams(String),

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("ledger endpoint unreachable: {0}")]
    EndpointUnreachable(String),

    #[error("transaction rejected by the ledger: {0}")]
    SubmissionRejected(String),

    #[error("transaction {signature} failed on-chain: {detail}")]
    ExecutionFailed { signature: String, detail: String },

    #[error("transaction {signature} not confirmed within {waited:?}")]
    Timeout { signature: String, waited: Duration },

    #[error("on-chain account {0} is not ready yet")]
    AccountNotReady(String),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

impl SyncError {
    pub fn invalid_address(value: &str, reason: impl ToString) -> Self {
        SyncError::InvalidAddress {
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            SyncError::EmptyInput(_)
            | SyncError::InvalidAddress { .. }
            | SyncError::InvalidProgramId(_)
            | SyncError::InvalidSeedEncoding(_)
            | SyncError::DecodeFailure(_)
            | SyncError::InvalidInstructionParams(_) => ErrorClass::Input,
            SyncError::NotConfigured(_) => ErrorClass::Configuration,
            SyncError::EndpointUnreachable(_) => ErrorClass::Transport,
            SyncError::SubmissionRejected(_) | SyncError::ExecutionFailed { .. } => {
                ErrorClass::ExecutionFailure
            }
            SyncError::Timeout { .. } => ErrorClass::Timeout,
            SyncError::AccountNotReady(_) => ErrorClass::NotYetAvailable,
            SyncError::Bootstrap(e) => e.class(),
        }
    }
}

impl From<LedgerError> for SyncError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unreachable(detail) | LedgerError::Malformed(detail) => {
                SyncError::EndpointUnreachable(detail)
            }
            LedgerError::Rejected(detail) => SyncError::SubmissionRejected(detail),
        }
    }
}

/// Failures of the one-time shared configuration bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("bootstrap not configured: {0}")]
    NotConfigured(String),

    #[error(
        "shared config account is not initialized and no bootstrap credential is configured \
         (set SOLANA_AUTHORITY_KEY or SOLANA_AUTHORITY_KEYPAIR_PATH)"
    )]
    MissingBootstrapCredential,

    #[error("bootstrap credential is invalid: {0}")]
    InvalidBootstrapCredential(String),

    #[error("another process is initializing the shared config account; retry shortly")]
    AlreadyRunningElsewhere,

    #[error("could not read the shared config account: {0}")]
    LedgerUnavailable(String),

    #[error("initialization transaction submission failed: {0}")]
    SubmissionFailed(String),

    #[error("initialization transaction was not confirmed: {0}")]
    ConfirmationFailed(String),
}

impl BootstrapError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BootstrapError::NotConfigured(_)
            | BootstrapError::MissingBootstrapCredential
            | BootstrapError::InvalidBootstrapCredential(_) => ErrorClass::Configuration,
            BootstrapError::AlreadyRunningElsewhere => ErrorClass::NotYetAvailable,
            BootstrapError::LedgerUnavailable(_) => ErrorClass::Transport,
            BootstrapError::SubmissionFailed(_) => ErrorClass::ExecutionFailure,
            BootstrapError::ConfirmationFailed(_) => ErrorClass::Timeout,
        }
    }
}
