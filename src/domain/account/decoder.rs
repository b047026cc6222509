//! Typed views over the program's account layouts.
//!
//! Layouts are fixed by the deployed program (8-byte discriminator followed by
//! borsh fields). A buffer shorter than the fixed header means "not created
//! yet" and decodes to `None`; a truncated element list decodes to however many
//! whole elements are present.

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use super::reader::ByteReader;

pub const DISCRIMINATOR_LEN: usize = 8;
/// discriminator + activity + authority + u32 element count
pub const LIST_HEADER_LEN: usize = DISCRIMINATOR_LEN + 32 + 32 + 4;
pub const MAX_CHECK_INS: usize = 200;
pub const MAX_TALLY_ENTRIES: usize = 100;
pub const MAX_TITLE_LEN: usize = 128;

const CHECK_IN_ELEMENT_LEN: usize = 32;
const TALLY_ELEMENT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInRegistry {
    pub activity: Pubkey,
    pub authority: Pubkey,
    pub attendees: Vec<Pubkey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVote {
    pub candidate_id: u64,
    pub vote_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTally {
    pub activity: Pubkey,
    pub authority: Pubkey,
    pub counts: Vec<CandidateVote>,
}

/// On-chain lifecycle phase of an activity, in program declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPhase {
    Draft,
    Published,
    Registration,
    CheckIn,
    TeamFormation,
    Submission,
    Voting,
    Ended,
}

impl ActivityPhase {
    fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            0 => ActivityPhase::Draft,
            1 => ActivityPhase::Published,
            2 => ActivityPhase::Registration,
            3 => ActivityPhase::CheckIn,
            4 => ActivityPhase::TeamFormation,
            5 => ActivityPhase::Submission,
            6 => ActivityPhase::Voting,
            7 => ActivityPhase::Ended,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityAccount {
    pub authority: Pubkey,
    pub activity_id: u64,
    pub title: String,
    pub description_hash: [u8; 32],
    pub phase: ActivityPhase,
    pub bump: u8,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorConfigAccount {
    pub authority: Pubkey,
    pub admin_wallet: Pubkey,
    pub review_period_secs: u64,
    pub treasury_bump: u8,
    pub bump: u8,
}

struct ListHeader {
    activity: Pubkey,
    authority: Pubkey,
    declared: usize,
}

fn read_list_header(reader: &mut ByteReader<'_>) -> Option<ListHeader> {
    reader.skip(DISCRIMINATOR_LEN)?;
    Some(ListHeader {
        activity: reader.get_pubkey()?,
        authority: reader.get_pubkey()?,
        declared: reader.get_u32()? as usize,
    })
}

/// Number of elements to iterate: the declared count, clamped to `cap`.
/// Iteration still stops at the first element that does not fully fit.
fn element_budget(declared: usize, cap: usize) -> usize {
    declared.min(cap)
}

pub fn decode_check_ins(data: &[u8]) -> Option<CheckInRegistry> {
    let mut reader = ByteReader::new(data);
    let header = read_list_header(&mut reader)?;
    let budget = element_budget(header.declared, MAX_CHECK_INS);

    let mut attendees = Vec::with_capacity(budget.min(reader.remaining() / CHECK_IN_ELEMENT_LEN));
    for _ in 0..budget {
        match reader.get_pubkey() {
            Some(key) => attendees.push(key),
            None => break,
        }
    }

    Some(CheckInRegistry {
        activity: header.activity,
        authority: header.authority,
        attendees,
    })
}

pub fn decode_vote_tally(data: &[u8]) -> Option<VoteTally> {
    let mut reader = ByteReader::new(data);
    let header = read_list_header(&mut reader)?;
    let budget = element_budget(header.declared, MAX_TALLY_ENTRIES);

    let mut counts = Vec::with_capacity(budget.min(reader.remaining() / TALLY_ELEMENT_LEN));
    for _ in 0..budget {
        let Some(element) = reader.get_bytes(TALLY_ELEMENT_LEN) else {
            break;
        };
        let mut element = ByteReader::new(element);
        // Both reads are in-bounds: the element slice is exactly 16 bytes.
        if let (Some(candidate_id), Some(vote_count)) = (element.get_u64(), element.get_u64()) {
            counts.push(CandidateVote {
                candidate_id,
                vote_count,
            });
        }
    }

    Some(VoteTally {
        activity: header.activity,
        authority: header.authority,
        counts,
    })
}

pub fn decode_activity(data: &[u8]) -> Option<ActivityAccount> {
    let mut reader = ByteReader::new(data);
    reader.skip(DISCRIMINATOR_LEN)?;
    let authority = reader.get_pubkey()?;
    let activity_id = reader.get_u64()?;

    let title_len = reader.get_u32()? as usize;
    if title_len > MAX_TITLE_LEN {
        return None;
    }
    let title = std::str::from_utf8(reader.get_bytes(title_len)?).ok()?.to_string();

    Some(ActivityAccount {
        authority,
        activity_id,
        title,
        description_hash: reader.get_array()?,
        phase: ActivityPhase::from_index(reader.get_u8()?)?,
        bump: reader.get_u8()?,
        created_at: reader.get_i64()?,
    })
}

pub fn decode_sponsor_config(data: &[u8]) -> Option<SponsorConfigAccount> {
    let mut reader = ByteReader::new(data);
    reader.skip(DISCRIMINATOR_LEN)?;
    Some(SponsorConfigAccount {
        authority: reader.get_pubkey()?,
        admin_wallet: reader.get_pubkey()?,
        review_period_secs: reader.get_u64()?,
        treasury_bump: reader.get_u8()?,
        bump: reader.get_u8()?,
    })
}

/// True when the buffer is at least a discriminator long, i.e. the account was
/// created by the program.
pub fn is_initialized(data: &[u8]) -> bool {
    data.len() >= DISCRIMINATOR_LEN
}
