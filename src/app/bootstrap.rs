//! One-time initialization of the shared sponsor config account.
//!
//! Every call re-reads the ledger; nothing is cached in-process. Concurrent
//! callers in different processes may all try to initialize. The program only
//! lets the first one succeed, and a losing attempt is resolved by reading the
//! account again.

use solana_program::instruction::{AccountMeta, Instruction};
use solana_program::pubkey::Pubkey;
use solana_program::system_program;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::signer::keypair::read_keypair_file;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use std::str::FromStr;
use std::sync::Arc;

use super::relay::TransactionRelay;
use super::watcher::{ConfirmationState, ConfirmationWatcher, WatchPolicy};
use crate::domain::account::is_initialized;
use crate::domain::address::DerivedAccount;
use crate::error::BootstrapError;
use crate::infra::config::{BootstrapCredential, SyncConfig};
use crate::infra::solana::Ledger;

/// Anchor discriminator of `initialize_sponsor_config`.
pub const INITIALIZE_SPONSOR_CONFIG_DISCRIMINATOR: [u8; 8] = [233, 86, 2, 56, 141, 50, 231, 94];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The account was already there; nothing was sent.
    AlreadyInitialized,
    /// This call created the account.
    Initialized { signature: Signature },
    /// Our attempt failed but another process created the account meanwhile.
    InitializedElsewhere,
}

/// `initialize_sponsor_config(admin_wallet, review_period_secs)` instruction.
pub fn initialize_sponsor_config_instruction(
    program_id: &Pubkey,
    authority: &Pubkey,
    config_account: &Pubkey,
    treasury: &Pubkey,
    admin_wallet: &Pubkey,
    review_period_secs: u64,
) -> Instruction {
    let mut data = Vec::with_capacity(8 + 32 + 8);
    data.extend_from_slice(&INITIALIZE_SPONSOR_CONFIG_DISCRIMINATOR);
    data.extend_from_slice(admin_wallet.as_ref());
    data.extend_from_slice(&review_period_secs.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(*config_account, false),
            AccountMeta::new(*treasury, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

/// Loads the server-held bootstrap key.
pub fn load_bootstrap_keypair(credential: &BootstrapCredential) -> Result<Keypair, BootstrapError> {
    match credential {
        BootstrapCredential::Base58(encoded) => {
            let bytes = bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|e| BootstrapError::InvalidBootstrapCredential(format!("not base58: {e}")))?;
            Keypair::from_bytes(&bytes).map_err(|e| {
                BootstrapError::InvalidBootstrapCredential(format!("not a 64-byte keypair: {e}"))
            })
        }
        BootstrapCredential::KeypairFile(path) => read_keypair_file(path).map_err(|e| {
            BootstrapError::InvalidBootstrapCredential(format!("failed to read {path}: {e}"))
        }),
    }
}

// A duplicate `init` fails in the system program's `Allocate` with
// `AccountAlreadyInUse`, which the RPC renders as custom error 0 on the
// first (and only) instruction. Simulation logs spell it "already in use".
fn looks_like_collision(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    detail.contains("already in use")
        || detail.contains("already initialized")
        || detail
            .split(|c: char| c == ';' || c == '\n')
            .any(|part| part.trim_end().ends_with("instruction 0: custom program error: 0x0"))
}

pub struct BootstrapInitializer {
    config: SyncConfig,
    ledger: Arc<dyn Ledger>,
    relay: TransactionRelay,
    watcher: ConfirmationWatcher,
}

impl BootstrapInitializer {
    pub fn new(config: SyncConfig, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            relay: TransactionRelay::new(ledger.clone()),
            watcher: ConfirmationWatcher::new(ledger.clone()),
            config,
            ledger,
        }
    }

    fn program_id(&self) -> Result<Pubkey, BootstrapError> {
        self.config
            .require_program_id()
            .map_err(|e| BootstrapError::NotConfigured(e.to_string()))
    }

    fn derive(&self, account: DerivedAccount, program_id: &Pubkey) -> Result<Pubkey, BootstrapError> {
        account
            .derive(program_id)
            .map(|pa| pa.address)
            .map_err(|e| BootstrapError::NotConfigured(e.to_string()))
    }

    pub async fn config_exists(&self, config_account: &Pubkey) -> Result<bool, BootstrapError> {
        let data = self
            .ledger
            .get_account_data(config_account)
            .await
            .map_err(|e| BootstrapError::LedgerUnavailable(e.to_string()))?;
        Ok(data.as_deref().is_some_and(is_initialized))
    }

    pub async fn ensure_initialized(&self) -> Result<BootstrapOutcome, BootstrapError> {
        let program_id = self.program_id()?;
        let config_account = self.derive(DerivedAccount::Config, &program_id)?;

        if self.config_exists(&config_account).await? {
            tracing::debug!(address = %config_account, "shared config account exists");
            return Ok(BootstrapOutcome::AlreadyInitialized);
        }

        let credential = self
            .config
            .bootstrap_credential
            .as_ref()
            .ok_or(BootstrapError::MissingBootstrapCredential)?;
        let authority = load_bootstrap_keypair(credential)?;
        let admin_wallet = match self.config.sponsor_admin_wallet.as_deref() {
            Some(raw) => Pubkey::from_str(raw).map_err(|_| {
                BootstrapError::NotConfigured(format!(
                    "SOLANA_SPONSOR_ADMIN_WALLET '{raw}' is not a valid public key"
                ))
            })?,
            None => authority.pubkey(),
        };
        let treasury = self.derive(DerivedAccount::SponsorTreasury, &program_id)?;

        tracing::info!(
            address = %config_account,
            authority = %authority.pubkey(),
            admin_wallet = %admin_wallet,
            "initializing shared config account"
        );

        let instruction = initialize_sponsor_config_instruction(
            &program_id,
            &authority.pubkey(),
            &config_account,
            &treasury,
            &admin_wallet,
            self.config.sponsor_review_period_secs,
        );

        match self.send_and_watch(&authority, instruction).await {
            Ok(signature) => {
                tracing::info!(signature = %signature, address = %config_account, "shared config account initialized");
                Ok(BootstrapOutcome::Initialized { signature })
            }
            Err(failure) => self.resolve_failure(&config_account, failure).await,
        }
    }

    async fn send_and_watch(
        &self,
        authority: &Keypair,
        instruction: Instruction,
    ) -> Result<Signature, BootstrapError> {
        let blockhash = self
            .ledger
            .get_latest_blockhash()
            .await
            .map_err(|e| BootstrapError::SubmissionFailed(format!("latest blockhash: {e}")))?;
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&authority.pubkey()),
            &[authority],
            blockhash,
        );
        let pending = self
            .relay
            .submit_transaction(&VersionedTransaction::from(tx))
            .await
            .map_err(|e| BootstrapError::SubmissionFailed(e.to_string()))?;

        match self
            .watcher
            .watch(&pending.signature, WatchPolicy::bootstrap(&self.config))
            .await
        {
            ConfirmationState::Confirmed => Ok(pending.signature),
            ConfirmationState::ExecutionFailed(detail) => Err(BootstrapError::ConfirmationFailed(
                format!("{} failed on-chain: {detail}", pending.signature),
            )),
            ConfirmationState::TimedOut | ConfirmationState::Pending => {
                Err(BootstrapError::ConfirmationFailed(format!(
                    "{} not confirmed in time",
                    pending.signature
                )))
            }
        }
    }

    /// After a failed attempt the account itself is the source of truth.
    async fn resolve_failure(
        &self,
        config_account: &Pubkey,
        failure: BootstrapError,
    ) -> Result<BootstrapOutcome, BootstrapError> {
        match self.config_exists(config_account).await {
            Ok(true) => {
                tracing::info!(address = %config_account, "config account initialized by another process");
                Ok(BootstrapOutcome::InitializedElsewhere)
            }
            Ok(false) if looks_like_collision(&failure.to_string()) => {
                tracing::warn!(address = %config_account, "initialization collided with another process");
                Err(BootstrapError::AlreadyRunningElsewhere)
            }
            _ => {
                tracing::warn!(address = %config_account, error = %failure, "bootstrap failed");
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_layout() {
        let program = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let config = Pubkey::new_unique();
        let treasury = Pubkey::new_unique();
        let admin = Pubkey::new_from_array([9u8; 32]);

        let ix = initialize_sponsor_config_instruction(
            &program, &authority, &config, &treasury, &admin, 10_800,
        );
        assert_eq!(&ix.data[..8], &INITIALIZE_SPONSOR_CONFIG_DISCRIMINATOR);
        assert_eq!(&ix.data[8..40], &[9u8; 32]);
        assert_eq!(&ix.data[40..], &10_800u64.to_le_bytes());
        assert_eq!(ix.accounts.len(), 4);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert!(ix.accounts[1].is_writable && !ix.accounts[1].is_signer);
        assert_eq!(ix.accounts[3].pubkey, system_program::id());
        assert!(!ix.accounts[3].is_writable);
    }

    #[test]
    fn base58_credential_round_trips() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();
        let loaded = load_bootstrap_keypair(&BootstrapCredential::Base58(encoded)).unwrap();
        assert_eq!(loaded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn bad_credentials_are_reported() {
        let err = load_bootstrap_keypair(&BootstrapCredential::Base58("0OIl".into())).unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidBootstrapCredential(_)));

        let short = bs58::encode([1u8; 10]).into_string();
        let err = load_bootstrap_keypair(&BootstrapCredential::Base58(short)).unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidBootstrapCredential(_)));

        let err = load_bootstrap_keypair(&BootstrapCredential::KeypairFile(
            "/nonexistent/id.json".into(),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/id.json"));
    }

    #[test]
    fn collision_detection() {
        assert!(looks_like_collision(
            "Allocate: account Address { address: 9x.., base: None } already in use"
        ));
        assert!(looks_like_collision(
            "RPC response error -32002: Transaction simulation failed: \
             Error processing Instruction 0: custom program error: 0x0; 4 log messages:"
        ));
        assert!(looks_like_collision(
            "Error processing Instruction 0: custom program error: 0x0"
        ));
        assert!(!looks_like_collision(
            "Error processing Instruction 0: custom program error: 0x1770"
        ));
        assert!(!looks_like_collision(
            "Error processing Instruction 1: custom program error: 0x0"
        ));
        assert!(!looks_like_collision("insufficient funds for rent"));
    }
}
