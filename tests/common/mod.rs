//! Shared fixtures: a scripted in-memory ledger and helpers to build signed
//! wire transactions.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine as _;
use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chain_sync_engine::solana::{Ledger, LedgerError, SignatureStatus};
use chain_sync_engine::SyncConfig;

pub const ENDPOINT: &str = "http://ledger.test:8899";

/// A `Ledger` whose answers are scripted by the test.
///
/// Status answers are consumed in order; the last one repeats forever.
#[derive(Default)]
pub struct ScriptedLedger {
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    statuses: Mutex<VecDeque<Result<SignatureStatus, LedgerError>>>,
    status_delay: Mutex<Option<Duration>>,
    send_error: Mutex<Option<LedgerError>>,
    create_on_send: Mutex<Option<(Pubkey, Vec<u8>)>>,
    sent: Mutex<Vec<VersionedTransaction>>,
    status_queries: AtomicUsize,
    account_reads: AtomicUsize,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(statuses: Vec<SignatureStatus>) -> Self {
        let ledger = Self::new();
        ledger.script_statuses(statuses.into_iter().map(Ok).collect());
        ledger
    }

    pub fn script_statuses(&self, statuses: Vec<Result<SignatureStatus, LedgerError>>) {
        *self.statuses.lock().unwrap() = statuses.into();
    }

    pub fn delay_status_queries(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }

    pub fn fail_sends_with(&self, err: LedgerError) {
        *self.send_error.lock().unwrap() = Some(err);
    }

    /// Simulates another process creating `address` while our send is in flight.
    pub fn create_account_on_send(&self, address: Pubkey, data: Vec<u8>) {
        *self.create_on_send.lock().unwrap() = Some((address, data));
    }

    pub fn sent(&self) -> Vec<VersionedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn status_queries(&self) -> usize {
        self.status_queries.load(Ordering::SeqCst)
    }

    pub fn account_reads(&self) -> usize {
        self.account_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for ScriptedLedger {
    fn endpoint(&self) -> &str {
        ENDPOINT
    }

    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, LedgerError> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, LedgerError> {
        if let Some((address, data)) = self.create_on_send.lock().unwrap().take() {
            self.set_account(address, data);
        }
        if let Some(err) = self.send_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
    ) -> Result<SignatureStatus, LedgerError> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        let delay = *self.status_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or(Ok(SignatureStatus::Unknown))
        } else {
            statuses.front().cloned().unwrap_or(Ok(SignatureStatus::Unknown))
        }
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        Ok(Hash::new_unique())
    }
}

/// Program id used by every test config.
pub fn program_id() -> Pubkey {
    Pubkey::new_from_array([42u8; 32])
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        rpc_url: Some(ENDPOINT.to_string()),
        program_id: Some(program_id().to_string()),
        ..SyncConfig::default()
    }
}

/// A wallet-signed transaction, as the client would post it.
pub fn signed_tx(payer: &Keypair) -> (String, Signature) {
    let instruction = Instruction::new_with_bytes(
        program_id(),
        &[1, 2, 3],
        vec![AccountMeta::new(payer.pubkey(), true)],
    );
    let tx = Transaction::new_signed_with_payer(
        &[instruction],
        Some(&payer.pubkey()),
        &[payer],
        Hash::new_unique(),
    );
    let signature = tx.signatures[0];
    let bytes = bincode::serialize(&VersionedTransaction::from(tx)).unwrap();
    (
        base64::engine::general_purpose::STANDARD.encode(bytes),
        signature,
    )
}

/// Account data that counts as "created by the program".
pub fn initialized_account() -> Vec<u8> {
    vec![7u8; 64]
}
