// Responsible for all communication with the Solana blockchain.

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_program::pubkey::Pubkey;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::sync::Arc;

use super::ledger::{Ledger, LedgerError, SignatureStatus};

/// `Ledger` backed by the nonblocking JSON-RPC client.
///
/// Reads use `confirmed` commitment; a `processed`-only account is treated as
/// absent so callers never act on state that may still roll back.
#[derive(Clone)]
pub struct RpcLedger {
    client: Arc<RpcClient>,
    endpoint: String,
}

impl RpcLedger {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        let endpoint = rpc_url.into();
        let client = RpcClient::new_with_commitment(endpoint.clone(), CommitmentConfig::confirmed());
        Self::with_client(client)
    }

    pub fn with_client(client: RpcClient) -> Self {
        Self {
            endpoint: client.url(),
            client: Arc::new(client),
        }
    }

    /// Underlying client, for diagnostics that fall outside the `Ledger` port.
    pub fn rpc(&self) -> &RpcClient {
        &self.client
    }
}

fn map_client_error(err: ClientError) -> LedgerError {
    match err.kind() {
        ClientErrorKind::Io(_) | ClientErrorKind::Reqwest(_) => {
            LedgerError::Unreachable(err.to_string())
        }
        ClientErrorKind::SerdeJson(_) => LedgerError::Malformed(err.to_string()),
        _ => LedgerError::Rejected(err.to_string()),
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .map_err(map_client_error)?;
        Ok(response.value.map(|account| account.data))
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, LedgerError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(map_client_error)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<SignatureStatus, LedgerError> {
        // Search history too: a slow bootstrap can outlive the recent-status cache.
        let response = self
            .client
            .get_signature_statuses_with_history(&[*signature])
            .await
            .map_err(map_client_error)?;

        let Some(status) = response.value.into_iter().next().flatten() else {
            return Ok(SignatureStatus::Unknown);
        };

        if let Some(err) = &status.err {
            return Ok(SignatureStatus::Failed(err.to_string()));
        }
        if status.satisfies_commitment(CommitmentConfig::finalized()) {
            return Ok(SignatureStatus::Finalized);
        }
        if status.satisfies_commitment(CommitmentConfig::confirmed()) {
            return Ok(SignatureStatus::Confirmed);
        }
        Ok(SignatureStatus::Processed)
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(map_client_error)
    }
}
