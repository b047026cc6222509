//! Wallet signature verification for the two supported wallet ecosystems.
//!
//! * EVM wallets (MetaMask) sign with EIP-191 `personal_sign`; we recover the
//!   secp256k1 public key from the 65-byte signature and compare the derived
//!   address against the claimed one, case-insensitively.
//! * Solana wallets (Phantom) sign the raw message with Ed25519; the claimed
//!   address *is* the public key, so verification is a plain signature check.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use solana_program::secp256k1_recover::secp256k1_recover;
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::infra::config::SyncConfig;

const EVM_SIGNATURE_HEX_LEN: usize = 130;
const EVM_ADDRESS_HEX_LEN: usize = 40;
const ED25519_SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalletType {
    #[serde(rename = "metamask")]
    Evm,
    #[serde(rename = "phantom")]
    Solana,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::Evm => "metamask",
            WalletType::Solana => "phantom",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletType {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metamask" | "evm" => Ok(WalletType::Evm),
            "phantom" | "solana" => Ok(WalletType::Solana),
            other => Err(SignatureError::UnknownWalletType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("unknown wallet type '{0}'")]
    UnknownWalletType(String),

    #[error("invalid {wallet} address '{address}'")]
    InvalidAddress { wallet: WalletType, address: String },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("invalid recovery id {0}, expected 27 or 28")]
    InvalidRecoveryId(u8),

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("signature was produced by {recovered}, not {claimed}")]
    AddressMismatch { claimed: String, recovered: String },

    #[error("signature does not verify against the given public key")]
    VerificationFailed,
}

/// Keccak-256 of the EIP-191 prefixed message.
pub fn eip191_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Lowercase `0x`-prefixed address of a 64-byte uncompressed public key (no 0x04 prefix).
pub fn evm_address_from_pubkey(pubkey: &[u8; 64]) -> String {
    let hash = Keccak256::digest(pubkey);
    format!("0x{}", hex::encode(&hash[12..]))
}

pub fn validate_address(wallet: WalletType, address: &str) -> Result<(), SignatureError> {
    let address = address.trim();
    let ok = match wallet {
        WalletType::Evm => address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .is_some_and(|h| h.len() == EVM_ADDRESS_HEX_LEN && h.bytes().all(|b| b.is_ascii_hexdigit())),
        WalletType::Solana => Pubkey::from_str(address).is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(SignatureError::InvalidAddress {
            wallet,
            address: address.to_string(),
        })
    }
}

/// Decodes a `0x` + 130 hex char signature into its 65 raw bytes.
fn parse_evm_signature(signature: &str) -> Result<[u8; 65], SignatureError> {
    let signature = signature.trim();
    let hex_part = signature.strip_prefix("0x").unwrap_or(signature);
    if hex_part.len() != EVM_SIGNATURE_HEX_LEN {
        return Err(SignatureError::MalformedSignature(format!(
            "expected {EVM_SIGNATURE_HEX_LEN} hex characters, got {}",
            hex_part.len()
        )));
    }
    let mut out = [0u8; 65];
    hex::decode_to_slice(hex_part, &mut out)
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    Ok(out)
}

/// Recovers the signer address of an EIP-191 signature.
pub fn recover_evm_address(message: &[u8], signature: &str) -> Result<String, SignatureError> {
    let sig = parse_evm_signature(signature)?;
    let recovery_id = match sig[64] {
        27 | 28 => sig[64] - 27,
        v => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    let pubkey = secp256k1_recover(&eip191_hash(message), recovery_id, &sig[..64])
        .map_err(|_| SignatureError::RecoveryFailed)?;
    Ok(evm_address_from_pubkey(&pubkey.to_bytes()))
}

pub fn verify_evm(address: &str, message: &[u8], signature: &str) -> Result<(), SignatureError> {
    validate_address(WalletType::Evm, address)?;
    let recovered = recover_evm_address(message, signature)?;
    if recovered.eq_ignore_ascii_case(address.trim()) {
        Ok(())
    } else {
        Err(SignatureError::AddressMismatch {
            claimed: address.trim().to_string(),
            recovered,
        })
    }
}

pub fn verify_solana(address: &str, message: &[u8], signature: &str) -> Result<(), SignatureError> {
    let pubkey = Pubkey::from_str(address.trim()).map_err(|_| SignatureError::InvalidAddress {
        wallet: WalletType::Solana,
        address: address.trim().to_string(),
    })?;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(signature.trim())
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    if raw.len() != ED25519_SIGNATURE_LEN {
        return Err(SignatureError::MalformedSignature(format!(
            "expected {ED25519_SIGNATURE_LEN} bytes, got {}",
            raw.len()
        )));
    }
    let sig = Signature::try_from(raw.as_slice())
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    if sig.verify(pubkey.as_ref(), message) {
        Ok(())
    } else {
        Err(SignatureError::VerificationFailed)
    }
}

/// Dispatches to the scheme selected by the wallet type.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    /// Lowercased EVM addresses that skip key recovery. Empty unless enabled.
    test_wallets: Vec<String>,
}

impl SignatureVerifier {
    /// `test_wallets` only takes effect when `allow_test_wallets` is set.
    pub fn new(test_wallets: &[String], allow_test_wallets: bool) -> Self {
        let test_wallets = if allow_test_wallets {
            test_wallets.iter().map(|w| w.trim().to_ascii_lowercase()).collect()
        } else {
            Vec::new()
        };
        Self { test_wallets }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.test_wallets, config.allow_test_wallets)
    }

    fn is_test_wallet(&self, address: &str) -> bool {
        let address = address.trim().to_ascii_lowercase();
        self.test_wallets.iter().any(|w| *w == address)
    }

    pub fn verify(
        &self,
        wallet: WalletType,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<(), SignatureError> {
        match wallet {
            WalletType::Evm if self.is_test_wallet(address) => {
                tracing::warn!(address = %address.trim(), "test wallet: skipping key recovery");
                parse_evm_signature(signature).map(|_| ())
            }
            WalletType::Evm => verify_evm(address, message.as_bytes(), signature),
            WalletType::Solana => verify_solana(address, message.as_bytes(), signature),
        }
    }
}
