//! The synchronization engine as seen by the CRUD layer.
//!
//! `ChainSync` ties the pieces together:
//! 1.  Prepares transaction inputs (derived addresses + instruction params) for
//!     a client wallet to sign.
//! 2.  Relays the signed transaction and blocks until it is confirmed.
//! 3.  Reads and decodes on-chain lists for display.
//! 4.  Runs the shared-config bootstrap before flows that depend on it.

use serde_json::json;
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::bootstrap::{BootstrapInitializer, BootstrapOutcome};
use super::intents::{PreparedTransaction, TxIntent};
use super::relay::TransactionRelay;
use super::watcher::{ConfirmationWatcher, WatchPolicy};
use crate::crypto::hashing::description_hash_hex;
use crate::crypto::signature::{SignatureError, SignatureVerifier, WalletType};
use crate::domain::account::{
    decode_activity, decode_check_ins, decode_vote_tally, is_initialized, ActivityAccount,
    CandidateVote, MAX_CHECK_INS, MAX_TALLY_ENTRIES, MAX_TITLE_LEN,
};
use crate::domain::address::{parse_address, AccountKind, DerivedAccount};
use crate::domain::stage::{ChainInstruction, Stage};
use crate::error::SyncError;
use crate::infra::config::SyncConfig;
use crate::infra::solana::{Ledger, RpcLedger};

pub struct ChainSync {
    config: SyncConfig,
    ledger: Arc<dyn Ledger>,
    relay: TransactionRelay,
    watcher: ConfirmationWatcher,
    bootstrap: BootstrapInitializer,
    verifier: SignatureVerifier,
}

impl ChainSync {
    pub fn new(config: SyncConfig, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            relay: TransactionRelay::new(ledger.clone()),
            watcher: ConfirmationWatcher::new(ledger.clone()),
            bootstrap: BootstrapInitializer::new(config.clone(), ledger.clone()),
            verifier: SignatureVerifier::from_config(&config),
            config,
            ledger,
        }
    }

    /// Connects to `SOLANA_RPC_URL` with the production RPC client.
    pub fn connect(config: SyncConfig) -> Result<Self, SyncError> {
        let (rpc_url, _) = config.require_chain()?;
        let ledger: Arc<dyn Ledger> = Arc::new(RpcLedger::new(rpc_url));
        Ok(Self::new(config, ledger))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    fn chain_settings(&self) -> Result<(String, Pubkey), SyncError> {
        let (rpc_url, program_id) = self.config.require_chain()?;
        Ok((rpc_url.to_string(), program_id))
    }

    pub async fn prepare_transaction_inputs(
        &self,
        intent: TxIntent,
    ) -> Result<PreparedTransaction, SyncError> {
        match intent {
            TxIntent::PublishActivity {
                activity_id,
                authority,
                title,
                description,
            } => self.prepare_publish(activity_id, authority.as_deref(), &title, &description),
            TxIntent::SwitchStage {
                activity_id,
                stage,
                activity_address,
                attendees,
                tally,
            } => self.prepare_switch_stage(
                activity_id,
                stage,
                activity_address.as_deref(),
                &attendees,
                &tally,
            ),
            TxIntent::SponsorApply { application_id } => {
                self.ensure_initialized().await?;
                self.prepare_sponsor_apply(application_id)
            }
            TxIntent::SponsorReview {
                application_id,
                sponsor_wallet,
                approve,
            } => self.prepare_sponsor_review(application_id, &sponsor_wallet, approve),
        }
    }

    fn prepare_publish(
        &self,
        activity_id: u64,
        authority: Option<&str>,
        title: &str,
        description: &str,
    ) -> Result<PreparedTransaction, SyncError> {
        let (rpc_url, program_id) = self.chain_settings()?;
        if title.len() > MAX_TITLE_LEN {
            return Err(SyncError::InvalidInstructionParams(format!(
                "title is {} bytes, at most {MAX_TITLE_LEN} fit on-chain",
                title.len()
            )));
        }

        let mut derived = BTreeMap::new();
        if let Some(authority) = authority.map(str::trim).filter(|a| !a.is_empty()) {
            let authority = parse_address(authority)?;
            let activity = DerivedAccount::Activity {
                authority,
                activity_id,
            }
            .derive(&program_id)?
            .address;
            derived.insert(AccountKind::Activity, activity.to_string());
        }

        Ok(PreparedTransaction {
            need_chain_update: true,
            program_id: Some(program_id.to_string()),
            rpc_url: Some(rpc_url),
            instruction: Some(ChainInstruction::PublishActivity),
            derived_addresses: derived,
            params: json!({
                "activity_id": activity_id,
                "title": title,
                "description_hash_hex": description_hash_hex(description),
            }),
        })
    }

    fn prepare_switch_stage(
        &self,
        activity_id: u64,
        stage: Stage,
        activity_address: Option<&str>,
        attendees: &[String],
        tally: &[CandidateVote],
    ) -> Result<PreparedTransaction, SyncError> {
        let Some(instruction) = stage.chain_instruction() else {
            return Ok(PreparedTransaction::off_chain());
        };
        // Activities published before on-chain sync have no address.
        let Some(activity_address) = activity_address.map(str::trim).filter(|a| !a.is_empty())
        else {
            return Ok(PreparedTransaction::off_chain());
        };

        let (rpc_url, program_id) = self.chain_settings()?;
        let activity = parse_address(activity_address)?;

        let mut derived = BTreeMap::new();
        derived.insert(AccountKind::Activity, activity.to_string());
        let mut params = json!({
            "activity_id": activity_id,
            "chain_activity_address": activity.to_string(),
        });

        match instruction {
            ChainInstruction::UploadCheckIns => {
                if attendees.len() > MAX_CHECK_INS {
                    return Err(SyncError::InvalidInstructionParams(format!(
                        "{} attendees, at most {MAX_CHECK_INS} fit on-chain",
                        attendees.len()
                    )));
                }
                let attendee_pubkeys = attendees
                    .iter()
                    .map(|a| parse_address(a).map(|k| k.to_string()))
                    .collect::<Result<Vec<_>, _>>()?;
                let registry = DerivedAccount::CheckInRegistry { activity }.derive(&program_id)?;
                derived.insert(AccountKind::CheckInRegistry, registry.address.to_string());
                params["attendee_pubkeys"] = json!(attendee_pubkeys);
            }
            ChainInstruction::UploadVoteTally => {
                if tally.len() > MAX_TALLY_ENTRIES {
                    return Err(SyncError::InvalidInstructionParams(format!(
                        "{} tally entries, at most {MAX_TALLY_ENTRIES} fit on-chain",
                        tally.len()
                    )));
                }
                let vote_tally = DerivedAccount::VoteTally { activity }.derive(&program_id)?;
                derived.insert(AccountKind::VoteTally, vote_tally.address.to_string());
                params["candidate_ids"] = json!(tally.iter().map(|c| c.candidate_id).collect::<Vec<_>>());
                params["vote_counts"] = json!(tally.iter().map(|c| c.vote_count).collect::<Vec<_>>());
            }
            _ => {}
        }

        Ok(PreparedTransaction {
            need_chain_update: true,
            program_id: Some(program_id.to_string()),
            rpc_url: Some(rpc_url),
            instruction: Some(instruction),
            derived_addresses: derived,
            params,
        })
    }

    fn sponsor_accounts(
        program_id: &Pubkey,
        application_id: u64,
    ) -> Result<BTreeMap<AccountKind, String>, SyncError> {
        [
            DerivedAccount::Config,
            DerivedAccount::SponsorTreasury,
            DerivedAccount::SponsorApplication { application_id },
        ]
        .into_iter()
        .map(|account| {
            account
                .derive(program_id)
                .map(|pa| (account.kind(), pa.address.to_string()))
        })
        .collect()
    }

    fn prepare_sponsor_apply(&self, application_id: u64) -> Result<PreparedTransaction, SyncError> {
        let (rpc_url, program_id) = self.chain_settings()?;
        Ok(PreparedTransaction {
            need_chain_update: true,
            program_id: Some(program_id.to_string()),
            rpc_url: Some(rpc_url),
            instruction: Some(ChainInstruction::SponsorApply),
            derived_addresses: Self::sponsor_accounts(&program_id, application_id)?,
            params: json!({ "application_id": application_id }),
        })
    }

    fn prepare_sponsor_review(
        &self,
        application_id: u64,
        sponsor_wallet: &str,
        approve: bool,
    ) -> Result<PreparedTransaction, SyncError> {
        let (rpc_url, program_id) = self.chain_settings()?;
        let admin_wallet = self.config.sponsor_admin_wallet.as_deref().ok_or_else(|| {
            SyncError::NotConfigured("SOLANA_SPONSOR_ADMIN_WALLET is not set".to_string())
        })?;
        let admin_wallet = parse_address(admin_wallet)?;
        let sponsor_wallet = parse_address(sponsor_wallet)?;
        let instruction = if approve {
            ChainInstruction::ApproveSponsor
        } else {
            ChainInstruction::RejectSponsor
        };

        Ok(PreparedTransaction {
            need_chain_update: true,
            program_id: Some(program_id.to_string()),
            rpc_url: Some(rpc_url),
            instruction: Some(instruction),
            derived_addresses: Self::sponsor_accounts(&program_id, application_id)?,
            params: json!({
                "application_id": application_id,
                "admin_wallet": admin_wallet.to_string(),
                "sponsor_wallet": sponsor_wallet.to_string(),
            }),
        })
    }

    /// Relays a wallet-signed transaction and returns its signature once the
    /// ledger reports it confirmed.
    pub async fn submit_and_confirm(&self, signed_tx_base64: &str) -> Result<Signature, SyncError> {
        let pending = self.relay.submit(signed_tx_base64).await?;
        self.watcher
            .await_confirmation(&pending.signature, WatchPolicy::confirmation(&self.config))
            .await?;
        Ok(pending.signature)
    }

    /// Applies a signed stage-switch transaction. Returns `None` when the
    /// stage has no on-chain counterpart or the activity was never published
    /// on-chain.
    pub async fn submit_stage_transition(
        &self,
        stage: Stage,
        activity_address: Option<&str>,
        signed_tx_base64: &str,
    ) -> Result<Option<Signature>, SyncError> {
        let Some(activity_address) = activity_address.map(str::trim).filter(|a| !a.is_empty())
        else {
            return Ok(None);
        };
        if !stage.needs_chain_update() {
            return Ok(None);
        }
        if signed_tx_base64.trim().is_empty() {
            return Err(SyncError::EmptyInput("signed transaction"));
        }
        // A freshly published activity may not be visible yet.
        if !self.activity_account_exists(activity_address).await? {
            return Err(SyncError::AccountNotReady(activity_address.to_string()));
        }
        self.submit_and_confirm(signed_tx_base64).await.map(Some)
    }

    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, SyncError> {
        Ok(self.ledger.get_account_data(address).await?)
    }

    pub async fn activity_account_exists(&self, activity_address: &str) -> Result<bool, SyncError> {
        let activity = parse_address(activity_address)?;
        let data = self.account_data(&activity).await?;
        Ok(data.as_deref().is_some_and(is_initialized))
    }

    pub async fn read_activity(
        &self,
        activity_address: &str,
    ) -> Result<Option<ActivityAccount>, SyncError> {
        let activity = parse_address(activity_address)?;
        Ok(self
            .account_data(&activity)
            .await?
            .as_deref()
            .and_then(decode_activity))
    }

    /// Checked-in attendees; empty while the registry does not exist yet.
    pub async fn read_check_ins(&self, activity_address: &str) -> Result<Vec<Pubkey>, SyncError> {
        let activity = parse_address(activity_address)?;
        let program_id = self.config.require_program_id()?;
        let registry = DerivedAccount::CheckInRegistry { activity }.derive(&program_id)?;
        Ok(self
            .account_data(&registry.address)
            .await?
            .as_deref()
            .and_then(decode_check_ins)
            .map(|r| r.attendees)
            .unwrap_or_default())
    }

    /// Published vote counts; empty while the tally does not exist yet.
    pub async fn read_vote_tally(
        &self,
        activity_address: &str,
    ) -> Result<Vec<CandidateVote>, SyncError> {
        let activity = parse_address(activity_address)?;
        let program_id = self.config.require_program_id()?;
        let tally = DerivedAccount::VoteTally { activity }.derive(&program_id)?;
        Ok(self
            .account_data(&tally.address)
            .await?
            .as_deref()
            .and_then(decode_vote_tally)
            .map(|t| t.counts)
            .unwrap_or_default())
    }

    pub fn verify_wallet_signature(
        &self,
        wallet: WalletType,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<(), SignatureError> {
        self.verifier.verify(wallet, address, message, signature)
    }

    pub async fn ensure_initialized(&self) -> Result<BootstrapOutcome, SyncError> {
        Ok(self.bootstrap.ensure_initialized().await?)
    }
}
