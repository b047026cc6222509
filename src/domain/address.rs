//! Deterministic program-derived addresses.
//!
//! Seed tags and byte order are a compatibility contract with the deployed
//! program: a single differing byte derives a different, non-existent account.

use serde::Serialize;
use solana_program::pubkey::{Pubkey, MAX_SEEDS, MAX_SEED_LEN};
use std::fmt;
use std::str::FromStr;

use crate::error::SyncError;

pub const ACTIVITY_SEED: &[u8] = b"activity";
pub const CONFIG_SEED: &[u8] = b"config";
pub const TREASURY_SEED: &[u8] = b"treasury";
pub const CHECK_INS_SEED: &[u8] = b"check_ins";
pub const VOTE_TALLY_SEED: &[u8] = b"vote_tally";
pub const VOTE_SEED: &[u8] = b"vote";
pub const SPONSOR_APPLICATION_SEED: &[u8] = b"sponsor_application";

/// Kinds of program accounts the engine can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Activity,
    /// The shared configuration account created once by the bootstrap.
    Config,
    SponsorTreasury,
    CheckInRegistry,
    VoteTally,
    VoteRecord,
    SponsorApplication,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountKind::Activity => "activity",
            AccountKind::Config => "config",
            AccountKind::SponsorTreasury => "sponsor_treasury",
            AccountKind::CheckInRegistry => "check_in_registry",
            AccountKind::VoteTally => "vote_tally",
            AccountKind::VoteRecord => "vote_record",
            AccountKind::SponsorApplication => "sponsor_application",
        };
        f.write_str(name)
    }
}

/// A derived account together with the domain inputs that fix its seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedAccount {
    Activity { authority: Pubkey, activity_id: u64 },
    Config,
    SponsorTreasury,
    CheckInRegistry { activity: Pubkey },
    VoteTally { activity: Pubkey },
    VoteRecord { activity: Pubkey, voter: Pubkey },
    SponsorApplication { application_id: u64 },
}

/// Result of a derivation: the off-curve address and its bump seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAddress {
    pub address: Pubkey,
    pub bump: u8,
}

impl fmt::Display for ProgramAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.address.fmt(f)
    }
}

impl DerivedAccount {
    pub fn kind(&self) -> AccountKind {
        match self {
            DerivedAccount::Activity { .. } => AccountKind::Activity,
            DerivedAccount::Config => AccountKind::Config,
            DerivedAccount::SponsorTreasury => AccountKind::SponsorTreasury,
            DerivedAccount::CheckInRegistry { .. } => AccountKind::CheckInRegistry,
            DerivedAccount::VoteTally { .. } => AccountKind::VoteTally,
            DerivedAccount::VoteRecord { .. } => AccountKind::VoteRecord,
            DerivedAccount::SponsorApplication { .. } => AccountKind::SponsorApplication,
        }
    }

    /// Seed tuple exactly as the program declares it.
    pub fn seeds(&self) -> Vec<Vec<u8>> {
        match self {
            DerivedAccount::Activity {
                authority,
                activity_id,
            } => vec![
                ACTIVITY_SEED.to_vec(),
                authority.to_bytes().to_vec(),
                activity_id.to_le_bytes().to_vec(),
            ],
            DerivedAccount::Config => vec![CONFIG_SEED.to_vec()],
            DerivedAccount::SponsorTreasury => vec![TREASURY_SEED.to_vec()],
            DerivedAccount::CheckInRegistry { activity } => {
                vec![CHECK_INS_SEED.to_vec(), activity.to_bytes().to_vec()]
            }
            DerivedAccount::VoteTally { activity } => {
                vec![VOTE_TALLY_SEED.to_vec(), activity.to_bytes().to_vec()]
            }
            DerivedAccount::VoteRecord { activity, voter } => vec![
                VOTE_SEED.to_vec(),
                activity.to_bytes().to_vec(),
                voter.to_bytes().to_vec(),
            ],
            DerivedAccount::SponsorApplication { application_id } => vec![
                SPONSOR_APPLICATION_SEED.to_vec(),
                application_id.to_le_bytes().to_vec(),
            ],
        }
    }

    pub fn derive(&self, program_id: &Pubkey) -> Result<ProgramAddress, SyncError> {
        let seeds = self.seeds();
        let refs: Vec<&[u8]> = seeds.iter().map(Vec::as_slice).collect();
        derive_with_program(program_id, &refs)
    }
}

/// Derives an address from a base58 program id and raw seeds.
pub fn derive(program_id: &str, seeds: &[&[u8]]) -> Result<ProgramAddress, SyncError> {
    let program_id = parse_program_id(program_id)?;
    derive_with_program(&program_id, seeds)
}

pub fn derive_with_program(
    program_id: &Pubkey,
    seeds: &[&[u8]],
) -> Result<ProgramAddress, SyncError> {
    // One slot is reserved for the bump seed.
    if seeds.len() >= MAX_SEEDS {
        return Err(SyncError::InvalidSeedEncoding(format!(
            "{} seeds given, at most {} allowed",
            seeds.len(),
            MAX_SEEDS - 1
        )));
    }
    if let Some((i, seed)) = seeds.iter().enumerate().find(|(_, s)| s.len() > MAX_SEED_LEN) {
        return Err(SyncError::InvalidSeedEncoding(format!(
            "seed #{i} is {} bytes, at most {MAX_SEED_LEN} allowed",
            seed.len()
        )));
    }

    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, bump)| ProgramAddress { address, bump })
        .ok_or_else(|| SyncError::InvalidSeedEncoding("no viable bump seed".to_string()))
}

pub fn parse_program_id(value: &str) -> Result<Pubkey, SyncError> {
    Pubkey::from_str(value.trim()).map_err(|_| SyncError::InvalidProgramId(value.to_string()))
}

/// Parses a base58 account address from the wire.
pub fn parse_address(value: &str) -> Result<Pubkey, SyncError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SyncError::EmptyInput("address"));
    }
    Pubkey::from_str(trimmed).map_err(|e| SyncError::invalid_address(trimmed, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Pubkey {
        Pubkey::new_from_array([7u8; 32])
    }

    #[test]
    fn derivation_is_deterministic() {
        let activity = Pubkey::new_unique();
        let a = DerivedAccount::CheckInRegistry { activity }
            .derive(&program())
            .unwrap();
        let b = DerivedAccount::CheckInRegistry { activity }
            .derive(&program())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn any_changed_seed_byte_changes_the_address() {
        let activity = Pubkey::new_from_array([1u8; 32]);
        let mut other = activity.to_bytes();
        other[31] ^= 0x01;
        let a = DerivedAccount::VoteTally { activity }.derive(&program()).unwrap();
        let b = DerivedAccount::VoteTally {
            activity: Pubkey::new_from_array(other),
        }
        .derive(&program())
        .unwrap();
        assert_ne!(a.address, b.address);
    }

    #[test]
    fn check_ins_and_vote_tally_differ_for_same_activity() {
        let activity = Pubkey::new_unique();
        let check_ins = DerivedAccount::CheckInRegistry { activity }
            .derive(&program())
            .unwrap();
        let tally = DerivedAccount::VoteTally { activity }.derive(&program()).unwrap();
        assert_ne!(check_ins.address, tally.address);
    }

    #[test]
    fn sponsor_application_uses_little_endian_id() {
        let derived = DerivedAccount::SponsorApplication { application_id: 42 }
            .derive(&program())
            .unwrap();
        let expected = Pubkey::find_program_address(
            &[b"sponsor_application", &[42, 0, 0, 0, 0, 0, 0, 0]],
            &program(),
        );
        assert_eq!((derived.address, derived.bump), expected);
    }

    #[test]
    fn activity_seeds_match_program_layout() {
        let authority = Pubkey::new_unique();
        let derived = DerivedAccount::Activity {
            authority,
            activity_id: 9,
        }
        .derive(&program())
        .unwrap();
        let expected = Pubkey::find_program_address(
            &[b"activity", authority.as_ref(), &9u64.to_le_bytes()],
            &program(),
        );
        assert_eq!(derived.address, expected.0);
    }

    #[test]
    fn string_entrypoint_matches_typed_derivation() {
        let program_str = program().to_string();
        let by_str = derive(&program_str, &[b"config"]).unwrap();
        let typed = DerivedAccount::Config.derive(&program()).unwrap();
        assert_eq!(by_str, typed);
    }

    #[test]
    fn invalid_program_id_is_rejected() {
        let err = derive("0OIl-not-base58", &[b"config"]).unwrap_err();
        assert!(matches!(err, SyncError::InvalidProgramId(_)));
    }

    #[test]
    fn oversized_seed_is_rejected() {
        let long = [0u8; 33];
        let err = derive_with_program(&program(), &[b"check_ins", &long]).unwrap_err();
        assert!(matches!(err, SyncError::InvalidSeedEncoding(_)));
    }

    #[test]
    fn too_many_seeds_are_rejected() {
        let seed: &[u8] = b"x";
        let seeds = vec![seed; MAX_SEEDS];
        let err = derive_with_program(&program(), &seeds).unwrap_err();
        assert!(matches!(err, SyncError::InvalidSeedEncoding(_)));
    }

    #[test]
    fn empty_address_is_an_input_error() {
        assert!(matches!(parse_address("  "), Err(SyncError::EmptyInput(_))));
        assert!(matches!(
            parse_address("not base58 !"),
            Err(SyncError::InvalidAddress { .. })
        ));
    }
}
