//! The ledger port: the four RPC operations the engine consumes.
//!
//! Components receive an `Arc<dyn Ledger>` at construction, so tests swap in a
//! scripted double and production wires `RpcLedger`.

use async_trait::async_trait;
use solana_program::pubkey::Pubkey;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// Network-level failure (connect, timeout, I/O). Safe to retry reads.
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    /// The node answered and refused the request (e.g. preflight simulation failed).
    #[error("rejected by node: {0}")]
    Rejected(String),
    /// The node answered with something we could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One observation of a transaction's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    /// The node has not seen the signature (yet).
    Unknown,
    /// Executed by the leader but not voted on; effects may not be visible everywhere.
    Processed,
    /// Voted on by a supermajority.
    Confirmed,
    Finalized,
    /// Executed and failed; the detail is whatever the node reported.
    Failed(String),
}

impl SignatureStatus {
    /// True once effects are durable enough to read back from any replica.
    pub fn reached_finality_threshold(&self) -> bool {
        matches!(self, SignatureStatus::Confirmed | SignatureStatus::Finalized)
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// RPC URL this ledger talks to (handed to clients building transactions).
    fn endpoint(&self) -> &str;

    /// Raw account data, or `None` when the account does not exist.
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError>;

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, LedgerError>;

    async fn get_signature_status(&self, signature: &Signature)
        -> Result<SignatureStatus, LedgerError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError>;
}
