//! Decoding of raw account data returned by the ledger.

pub mod decoder;
pub mod reader;

pub use decoder::{
    decode_activity, decode_check_ins, decode_sponsor_config, decode_vote_tally,
    is_initialized, ActivityAccount, ActivityPhase, CandidateVote, CheckInRegistry,
    SponsorConfigAccount, VoteTally, MAX_CHECK_INS, MAX_TALLY_ENTRIES, MAX_TITLE_LEN,
};
pub use reader::ByteReader;
