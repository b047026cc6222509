//! Centralized configuration (environment variables + defaults).
//!
//! Nothing here panics on a missing variable: the ledger endpoint and program id
//! are optional at load time and the operations that need them report
//! `NotConfigured` instead.

use solana_program::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::error::SyncError;

pub const DEFAULT_SPONSOR_REVIEW_PERIOD_SECS: u64 = 10_800;
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(300);
/// Upper bound for every configured wait.
pub const MAX_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the server-held bootstrap key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum BootstrapCredential {
    /// Base58-encoded 64-byte secret key.
    Base58(String),
    /// Path to a JSON keypair file (`solana-keygen` format), `~` already expanded.
    KeypairFile(String),
}

impl std::fmt::Debug for BootstrapCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapCredential::Base58(_) => f.write_str("Base58(<redacted>)"),
            BootstrapCredential::KeypairFile(path) => write!(f, "KeypairFile({path})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Solana RPC URL (`SOLANA_RPC_URL`).
    pub rpc_url: Option<String>,
    /// Deployed program id (`SOLANA_PROGRAM_ID`), kept as text until first use.
    pub program_id: Option<String>,
    pub bootstrap_credential: Option<BootstrapCredential>,
    /// Receives approved sponsorships; falls back to the bootstrap authority.
    pub sponsor_admin_wallet: Option<String>,
    pub sponsor_review_period_secs: u64,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub bootstrap_timeout: Duration,
    pub test_wallets: Vec<String>,
    /// Test wallets bypass signature recovery; never enable in production.
    pub allow_test_wallets: bool,
    pub nonce_ttl: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            program_id: None,
            bootstrap_credential: None,
            sponsor_admin_wallet: None,
            sponsor_review_period_secs: DEFAULT_SPONSOR_REVIEW_PERIOD_SECS,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            bootstrap_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            test_wallets: Vec::new(),
            allow_test_wallets: false,
            nonce_ttl: DEFAULT_NONCE_TTL,
        }
    }
}

impl SyncConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bootstrap_credential = match (
            get("SOLANA_AUTHORITY_KEY"),
            get("SOLANA_AUTHORITY_KEYPAIR_PATH"),
        ) {
            (Some(key), _) => Some(BootstrapCredential::Base58(key)),
            (None, Some(path)) => Some(BootstrapCredential::KeypairFile(
                shellexpand::tilde(&path).to_string(),
            )),
            (None, None) => None,
        };

        let defaults = Self::default();
        Ok(Self {
            rpc_url: get("SOLANA_RPC_URL"),
            program_id: get("SOLANA_PROGRAM_ID"),
            bootstrap_credential,
            sponsor_admin_wallet: get("SOLANA_SPONSOR_ADMIN_WALLET"),
            sponsor_review_period_secs: parse_or(
                "SOLANA_SPONSOR_REVIEW_PERIOD_SECS",
                get("SOLANA_SPONSOR_REVIEW_PERIOD_SECS"),
                defaults.sponsor_review_period_secs,
            )?
            .max(1),
            confirmation_timeout: parse_secs_capped(
                "CONFIRMATION_TIMEOUT_SECS",
                get("CONFIRMATION_TIMEOUT_SECS"),
                defaults.confirmation_timeout,
            )?,
            poll_interval: Duration::from_millis(
                parse_or(
                    "CONFIRMATION_POLL_INTERVAL_MS",
                    get("CONFIRMATION_POLL_INTERVAL_MS"),
                    defaults.poll_interval.as_millis() as u64,
                )?
                .max(1),
            ),
            bootstrap_timeout: parse_secs_capped(
                "BOOTSTRAP_TIMEOUT_SECS",
                get("BOOTSTRAP_TIMEOUT_SECS"),
                defaults.bootstrap_timeout,
            )?,
            test_wallets: get("TEST_WALLETS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|w| !w.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            allow_test_wallets: parse_bool(
                "ALLOW_TEST_WALLETS",
                get("ALLOW_TEST_WALLETS"),
                defaults.allow_test_wallets,
            )?,
            nonce_ttl: parse_secs_capped(
                "NONCE_TTL_SECS",
                get("NONCE_TTL_SECS"),
                defaults.nonce_ttl,
            )?,
        })
    }

    /// Returns `(rpc_url, program_id)` or `NotConfigured`.
    pub fn require_chain(&self) -> Result<(&str, Pubkey), SyncError> {
        let rpc_url = self.rpc_url.as_deref().ok_or_else(|| {
            SyncError::NotConfigured("SOLANA_RPC_URL is not set".to_string())
        })?;
        Ok((rpc_url, self.require_program_id()?))
    }

    pub fn require_program_id(&self) -> Result<Pubkey, SyncError> {
        let raw = self.program_id.as_deref().ok_or_else(|| {
            SyncError::NotConfigured("SOLANA_PROGRAM_ID is not set".to_string())
        })?;
        Pubkey::from_str(raw).map_err(|_| SyncError::InvalidProgramId(raw.to_string()))
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_secs_capped(
    var: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let secs = parse_or(var, raw, default.as_secs())?;
    if secs > MAX_WAIT.as_secs() {
        return Err(ConfigError::InvalidValue {
            var,
            value: secs.to_string(),
            reason: format!("must be at most {} seconds", MAX_WAIT.as_secs()),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::InvalidValue {
            var,
            value: other.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}
