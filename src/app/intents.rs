//! What a client wallet needs to build and sign a program transaction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::account::CandidateVote;
use crate::domain::address::AccountKind;
use crate::domain::stage::{ChainInstruction, Stage};

/// A request for transaction inputs, one variant per client-signed flow.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxIntent {
    /// Create the on-chain activity. Without `authority` the activity address
    /// cannot be derived yet and the client computes it after wallet connect.
    PublishActivity {
        activity_id: u64,
        #[serde(default)]
        authority: Option<String>,
        title: String,
        #[serde(default)]
        description: String,
    },
    SwitchStage {
        activity_id: u64,
        stage: Stage,
        #[serde(default)]
        activity_address: Option<String>,
        /// Solana addresses of checked-in participants (team formation only).
        #[serde(default)]
        attendees: Vec<String>,
        /// Per-submission vote counts (results only).
        #[serde(default)]
        tally: Vec<CandidateVote>,
    },
    SponsorApply {
        application_id: u64,
    },
    SponsorReview {
        application_id: u64,
        sponsor_wallet: String,
        approve: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedTransaction {
    pub need_chain_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruction: Option<ChainInstruction>,
    /// Base58 addresses keyed by account kind.
    pub derived_addresses: BTreeMap<AccountKind, String>,
    pub params: serde_json::Value,
}

impl PreparedTransaction {
    /// Nothing to sign: the stage switch is off-chain only.
    pub fn off_chain() -> Self {
        Self {
            need_chain_update: false,
            program_id: None,
            rpc_url: None,
            instruction: None,
            derived_addresses: BTreeMap::new(),
            params: serde_json::Value::Null,
        }
    }
}
