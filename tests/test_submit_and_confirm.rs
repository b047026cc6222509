//! End-to-end flow against a scripted ledger:
//! 1) Prepare inputs for an activity that has no on-chain address yet.
//! 2) The client signs externally; the engine relays the blob.
//! 3) `submit_and_confirm` only returns once the status reaches Confirmed.
//! 4) Stage switches and list reads use the same derived addresses.

mod common;

use solana_sdk::signature::Keypair;
use std::sync::Arc;
use tokio::time::Instant;

use chain_sync_engine::app::TxIntent;
use chain_sync_engine::domain::stage::ChainInstruction;
use chain_sync_engine::domain::{AccountKind, DerivedAccount, Stage};
use chain_sync_engine::solana::{LedgerError, SignatureStatus};
use chain_sync_engine::{ChainSync, ErrorClass, SyncConfig, SyncError};
use common::{initialized_account, program_id, signed_tx, test_config, ScriptedLedger, ENDPOINT};

#[tokio::test(start_paused = true)]
async fn publish_then_confirm_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let ledger = Arc::new(ScriptedLedger::with_statuses(vec![
        SignatureStatus::Unknown,
        SignatureStatus::Processed,
        SignatureStatus::Confirmed,
    ]));
    let sync = ChainSync::new(test_config(), ledger.clone());

    let prepared = sync
        .prepare_transaction_inputs(TxIntent::PublishActivity {
            activity_id: 7,
            authority: None,
            title: "Solana Summer".into(),
            description: "Build things".into(),
        })
        .await?;
    assert!(prepared.need_chain_update);
    assert_eq!(prepared.program_id, Some(program_id().to_string()));
    assert_eq!(prepared.rpc_url.as_deref(), Some(ENDPOINT));
    assert_eq!(prepared.instruction, Some(ChainInstruction::PublishActivity));
    assert!(prepared.derived_addresses.is_empty());
    assert_eq!(prepared.params["activity_id"], 7);
    assert_eq!(
        prepared.params["description_hash_hex"].as_str().map(str::len),
        Some(64)
    );

    let payer = Keypair::new();
    let (wire, expected) = signed_tx(&payer);
    let started = Instant::now();
    let signature = sync.submit_and_confirm(&wire).await?;

    assert_eq!(signature, expected);
    assert_eq!(ledger.sent().len(), 1);
    assert_eq!(ledger.status_queries(), 3);
    assert!(started.elapsed() >= sync.config().poll_interval * 2);
    Ok(())
}

#[tokio::test]
async fn publish_with_authority_derives_the_activity_address() {
    let sync = ChainSync::new(test_config(), Arc::new(ScriptedLedger::new()));
    let authority = Keypair::new();
    let authority_str = solana_sdk::signer::Signer::pubkey(&authority).to_string();

    let prepared = sync
        .prepare_transaction_inputs(TxIntent::PublishActivity {
            activity_id: 3,
            authority: Some(authority_str.clone()),
            title: "t".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    let expected = DerivedAccount::Activity {
        authority: authority_str.parse().unwrap(),
        activity_id: 3,
    }
    .derive(&program_id())
    .unwrap();
    assert_eq!(
        prepared.derived_addresses.get(&AccountKind::Activity),
        Some(&expected.address.to_string())
    );
}

#[tokio::test]
async fn oversized_title_is_rejected_before_signing() {
    let sync = ChainSync::new(test_config(), Arc::new(ScriptedLedger::new()));
    let err = sync
        .prepare_transaction_inputs(TxIntent::PublishActivity {
            activity_id: 1,
            authority: None,
            title: "x".repeat(129),
            description: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Input);
}

#[tokio::test]
async fn unconfigured_chain_is_a_configuration_error() {
    let sync = ChainSync::new(SyncConfig::default(), Arc::new(ScriptedLedger::new()));
    let err = sync
        .prepare_transaction_inputs(TxIntent::SponsorReview {
            application_id: 1,
            sponsor_wallet: program_id().to_string(),
            approve: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotConfigured(_)));
}

#[tokio::test]
async fn relay_rejects_bad_input_without_touching_the_ledger() {
    let ledger = Arc::new(ScriptedLedger::new());
    let sync = ChainSync::new(test_config(), ledger.clone());

    let empty = sync.submit_and_confirm("   ").await.unwrap_err();
    assert!(matches!(empty, SyncError::EmptyInput(_)));

    let garbage = sync.submit_and_confirm("not base64!!").await.unwrap_err();
    assert!(matches!(garbage, SyncError::DecodeFailure(_)));

    let not_a_tx = sync.submit_and_confirm("AAAA").await.unwrap_err();
    assert!(matches!(not_a_tx, SyncError::DecodeFailure(_)));

    assert!(ledger.sent().is_empty());
    assert_eq!(ledger.status_queries(), 0);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let ledger = Arc::new(ScriptedLedger::new());
    ledger.fail_sends_with(LedgerError::Unreachable("connection refused".into()));
    let sync = ChainSync::new(test_config(), ledger.clone());

    let (wire, _) = signed_tx(&Keypair::new());
    let err = sync.submit_and_confirm(&wire).await.unwrap_err();
    assert!(matches!(err, SyncError::EndpointUnreachable(_)));
    assert_eq!(err.class(), ErrorClass::Transport);
    assert_eq!(ledger.status_queries(), 0);
}

#[tokio::test]
async fn switch_stage_without_chain_address_is_off_chain() {
    let sync = ChainSync::new(test_config(), Arc::new(ScriptedLedger::new()));
    let prepared = sync
        .prepare_transaction_inputs(TxIntent::SwitchStage {
            activity_id: 1,
            stage: Stage::Registration,
            activity_address: None,
            attendees: vec![],
            tally: vec![],
        })
        .await
        .unwrap();
    assert!(!prepared.need_chain_update);
    assert!(prepared.derived_addresses.is_empty());

    let (wire, _) = signed_tx(&Keypair::new());
    assert_eq!(
        sync.submit_stage_transition(Stage::Registration, None, &wire)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn team_formation_carries_attendees_and_registry_address() {
    let sync = ChainSync::new(test_config(), Arc::new(ScriptedLedger::new()));
    let activity = DerivedAccount::Activity {
        authority: program_id(),
        activity_id: 1,
    }
    .derive(&program_id())
    .unwrap()
    .address;
    let attendee = solana_program::pubkey::Pubkey::new_unique().to_string();

    let prepared = sync
        .prepare_transaction_inputs(TxIntent::SwitchStage {
            activity_id: 1,
            stage: Stage::TeamFormation,
            activity_address: Some(activity.to_string()),
            attendees: vec![attendee.clone()],
            tally: vec![],
        })
        .await
        .unwrap();

    assert_eq!(prepared.instruction, Some(ChainInstruction::UploadCheckIns));
    assert_eq!(prepared.params["attendee_pubkeys"][0], attendee.as_str());
    let registry = DerivedAccount::CheckInRegistry { activity }
        .derive(&program_id())
        .unwrap();
    assert_eq!(
        prepared.derived_addresses[&AccountKind::CheckInRegistry],
        registry.address.to_string()
    );

    let too_many = vec![attendee; 201];
    let err = sync
        .prepare_transaction_inputs(TxIntent::SwitchStage {
            activity_id: 1,
            stage: Stage::TeamFormation,
            activity_address: Some(activity.to_string()),
            attendees: too_many,
            tally: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidInstructionParams(_)));
}

#[tokio::test(start_paused = true)]
async fn stage_transition_waits_for_the_activity_account() {
    let ledger = Arc::new(ScriptedLedger::with_statuses(vec![SignatureStatus::Confirmed]));
    let sync = ChainSync::new(test_config(), ledger.clone());
    let activity = solana_program::pubkey::Pubkey::new_unique();
    let (wire, expected) = signed_tx(&Keypair::new());

    let err = sync
        .submit_stage_transition(Stage::Voting, Some(&activity.to_string()), &wire)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::AccountNotReady(_)));
    assert!(ledger.sent().is_empty());

    ledger.set_account(activity, initialized_account());
    let signature = sync
        .submit_stage_transition(Stage::Voting, Some(&activity.to_string()), &wire)
        .await
        .unwrap();
    assert_eq!(signature, Some(expected));
}

#[tokio::test]
async fn reads_decode_lists_and_treat_absence_as_empty() {
    let ledger = Arc::new(ScriptedLedger::new());
    let sync = ChainSync::new(test_config(), ledger.clone());
    let activity = solana_program::pubkey::Pubkey::new_unique();

    assert!(sync.read_check_ins(&activity.to_string()).await.unwrap().is_empty());
    assert!(sync.read_vote_tally(&activity.to_string()).await.unwrap().is_empty());

    let attendee = solana_program::pubkey::Pubkey::new_unique();
    let mut data = vec![0u8; 8];
    data.extend_from_slice(activity.as_ref());
    data.extend_from_slice(program_id().as_ref());
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(attendee.as_ref());
    let registry = DerivedAccount::CheckInRegistry { activity }
        .derive(&program_id())
        .unwrap();
    ledger.set_account(registry.address, data);

    assert_eq!(
        sync.read_check_ins(&activity.to_string()).await.unwrap(),
        vec![attendee]
    );

    let err = sync.read_check_ins("").await.unwrap_err();
    assert!(matches!(err, SyncError::EmptyInput(_)));
}
