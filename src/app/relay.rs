//! Forwards wallet-signed transactions to the ledger.
//!
//! The relay never inspects what a transaction does and never retries on its
//! own: resubmitting a signed transaction with a stale blockhash is the
//! caller's call to make.

use base64::Engine as _;
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;

use crate::error::SyncError;
use crate::infra::solana::Ledger;

/// A transaction the ledger accepted and whose outcome is not known yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub signature: Signature,
    pub endpoint: String,
}

#[derive(Clone)]
pub struct TransactionRelay {
    ledger: Arc<dyn Ledger>,
}

impl TransactionRelay {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Decodes a base64 wire transaction without sending it.
    pub fn decode(signed_tx_base64: &str) -> Result<VersionedTransaction, SyncError> {
        let encoded = signed_tx_base64.trim();
        if encoded.is_empty() {
            return Err(SyncError::EmptyInput("signed transaction"));
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SyncError::DecodeFailure(format!("invalid base64: {e}")))?;
        if bytes.len() > PACKET_DATA_SIZE {
            return Err(SyncError::DecodeFailure(format!(
                "{} bytes exceeds the {PACKET_DATA_SIZE} byte packet limit",
                bytes.len()
            )));
        }
        let tx: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| SyncError::DecodeFailure(format!("invalid transaction: {e}")))?;
        tx.sanitize()
            .map_err(|e| SyncError::DecodeFailure(format!("malformed transaction: {e}")))?;
        if tx.signatures.is_empty() {
            return Err(SyncError::DecodeFailure("transaction carries no signature".into()));
        }
        Ok(tx)
    }

    pub async fn submit(&self, signed_tx_base64: &str) -> Result<PendingTransaction, SyncError> {
        let tx = Self::decode(signed_tx_base64)?;
        self.submit_transaction(&tx).await
    }

    pub async fn submit_transaction(
        &self,
        tx: &VersionedTransaction,
    ) -> Result<PendingTransaction, SyncError> {
        let endpoint = self.ledger.endpoint().to_string();
        let signature = self.ledger.send_transaction(tx).await.map_err(|e| {
            tracing::warn!(endpoint = %endpoint, error = %e, "transaction submission failed");
            SyncError::from(e)
        })?;
        tracing::info!(signature = %signature, endpoint = %endpoint, "transaction submitted");
        Ok(PendingTransaction {
            signature,
            endpoint,
        })
    }
}
