//! Activity lifecycle stages and the program instruction each one drives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

/// Off-chain lifecycle stage an organizer can switch an activity into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Published,
    Registration,
    #[serde(rename = "checkin")]
    CheckIn,
    TeamFormation,
    Submission,
    Voting,
    Results,
}

/// Program instructions a client wallet signs for activity and sponsor flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainInstruction {
    PublishActivity,
    StartRegistration,
    StartCheckIn,
    UploadCheckIns,
    StartSubmission,
    StartVoting,
    UploadVoteTally,
    SponsorApply,
    ApproveSponsor,
    RejectSponsor,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Published,
        Stage::Registration,
        Stage::CheckIn,
        Stage::TeamFormation,
        Stage::Submission,
        Stage::Voting,
        Stage::Results,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Published => "published",
            Stage::Registration => "registration",
            Stage::CheckIn => "checkin",
            Stage::TeamFormation => "team_formation",
            Stage::Submission => "submission",
            Stage::Voting => "voting",
            Stage::Results => "results",
        }
    }

    /// Instruction that moves the on-chain activity into this stage, if any.
    pub fn chain_instruction(&self) -> Option<ChainInstruction> {
        match self {
            Stage::Published => None,
            Stage::Registration => Some(ChainInstruction::StartRegistration),
            Stage::CheckIn => Some(ChainInstruction::StartCheckIn),
            Stage::TeamFormation => Some(ChainInstruction::UploadCheckIns),
            Stage::Submission => Some(ChainInstruction::StartSubmission),
            Stage::Voting => Some(ChainInstruction::StartVoting),
            Stage::Results => Some(ChainInstruction::UploadVoteTally),
        }
    }

    pub fn needs_chain_update(&self) -> bool {
        self.chain_instruction().is_some()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == tag)
            .ok_or_else(|| SyncError::InvalidInstructionParams(format!("unknown stage '{tag}'")))
    }
}

impl ChainInstruction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainInstruction::PublishActivity => "publish_activity",
            ChainInstruction::StartRegistration => "start_registration",
            ChainInstruction::StartCheckIn => "start_check_in",
            ChainInstruction::UploadCheckIns => "upload_check_ins",
            ChainInstruction::StartSubmission => "start_submission",
            ChainInstruction::StartVoting => "start_voting",
            ChainInstruction::UploadVoteTally => "upload_vote_tally",
            ChainInstruction::SponsorApply => "sponsor_apply",
            ChainInstruction::ApproveSponsor => "approve_sponsor",
            ChainInstruction::RejectSponsor => "reject_sponsor",
        }
    }
}

impl fmt::Display for ChainInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
