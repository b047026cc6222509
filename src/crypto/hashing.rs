// Content hashes committed on-chain alongside activity metadata.

use sha2::{Digest, Sha256};

/// SHA-256 of an activity description; the program stores only this digest.
pub fn description_hash(description: &str) -> [u8; 32] {
    Sha256::digest(description.as_bytes()).into()
}

pub fn description_hash_hex(description: &str) -> String {
    hex::encode(description_hash(description))
}
