//! Single-use login nonces.
//!
//! Every login attempt gets a fresh random nonce that the wallet signs as part
//! of a fixed message. The nonce is cleared by the first successful
//! verification, so replaying the same signed message fails.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use super::signature::{validate_address, SignatureError, SignatureVerifier, WalletType};
use crate::infra::config::SyncConfig;

pub const AUTH_MESSAGE_PREFIX: &str = "Please sign this message to authenticate: ";
const NONCE_BYTES: usize = 32;

/// The exact text a wallet is asked to sign for `nonce`.
pub fn auth_message(nonce: &str) -> String {
    format!("{AUTH_MESSAGE_PREFIX}{nonce}")
}

/// 32 random bytes, hex encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedNonce {
    pub value: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no pending nonce for this wallet; request a new one")]
    NoPendingNonce,

    #[error("nonce expired; request a new one")]
    NonceExpired,

    #[error("nonce was already used")]
    NonceConsumed,

    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureError),
}

/// Storage for the most recently issued nonce per wallet.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Replaces any pending nonce for `identity`.
    async fn put(&self, identity: &str, nonce: IssuedNonce);

    async fn current(&self, identity: &str) -> Option<IssuedNonce>;

    /// Removes the pending nonce only if it still equals `value`.
    /// Returns whether it was removed.
    async fn clear_if_matches(&self, identity: &str, value: &str) -> bool;

    /// Drops every nonce issued before `cutoff`. Returns how many were dropped.
    async fn evict_issued_before(&self, cutoff: DateTime<Utc>) -> usize;
}

#[derive(Debug, Default)]
pub struct InMemoryNonceStore {
    inner: Mutex<HashMap<String, IssuedNonce>>,
}

impl InMemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn put(&self, identity: &str, nonce: IssuedNonce) {
        self.inner.lock().await.insert(identity.to_string(), nonce);
    }

    async fn current(&self, identity: &str) -> Option<IssuedNonce> {
        self.inner.lock().await.get(identity).cloned()
    }

    async fn clear_if_matches(&self, identity: &str, value: &str) -> bool {
        let mut map = self.inner.lock().await;
        match map.get(identity) {
            Some(n) if n.value == value => {
                map.remove(identity);
                true
            }
            _ => false,
        }
    }

    async fn evict_issued_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, n| n.issued_at >= cutoff);
        before - map.len()
    }
}

/// What a client needs to ask the wallet for a signature.
#[derive(Debug, Clone, Serialize)]
pub struct AuthChallenge {
    pub nonce: String,
    pub message: String,
}

/// Issues nonces and verifies wallet logins against them.
pub struct WalletAuthenticator {
    store: Arc<dyn NonceStore>,
    verifier: SignatureVerifier,
    ttl: Duration,
}

impl WalletAuthenticator {
    pub fn new(store: Arc<dyn NonceStore>, verifier: SignatureVerifier, ttl: Duration) -> Self {
        Self {
            store,
            verifier,
            ttl,
        }
    }

    pub fn from_config(store: Arc<dyn NonceStore>, config: &SyncConfig) -> Self {
        Self::new(store, SignatureVerifier::from_config(config), config.nonce_ttl)
    }

    // EVM addresses are case-insensitive, base58 keys are not.
    fn identity(wallet: WalletType, address: &str) -> String {
        let address = address.trim();
        match wallet {
            WalletType::Evm => format!("{wallet}:{}", address.to_ascii_lowercase()),
            WalletType::Solana => format!("{wallet}:{address}"),
        }
    }

    pub async fn issue_nonce(
        &self,
        wallet: WalletType,
        address: &str,
    ) -> Result<AuthChallenge, AuthError> {
        validate_address(wallet, address)?;
        self.evict_expired().await;
        let nonce = generate_nonce();
        self.store
            .put(
                &Self::identity(wallet, address),
                IssuedNonce {
                    value: nonce.clone(),
                    issued_at: Utc::now(),
                },
            )
            .await;
        tracing::info!(address = %address.trim(), wallet = %wallet, "issued login nonce");
        Ok(AuthChallenge {
            message: auth_message(&nonce),
            nonce,
        })
    }

    // Anyone can request a nonce for any address, so expired entries go on every issue.
    async fn evict_expired(&self) {
        let Some(cutoff) = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return;
        };
        let evicted = self.store.evict_issued_before(cutoff).await;
        if evicted > 0 {
            tracing::debug!(evicted, "dropped expired login nonces");
        }
    }

    /// Verifies `signature` over the message embedding the pending nonce and
    /// consumes that nonce.
    pub async fn authenticate(
        &self,
        wallet: WalletType,
        address: &str,
        signature: &str,
    ) -> Result<(), AuthError> {
        let identity = Self::identity(wallet, address);
        let pending = self
            .store
            .current(&identity)
            .await
            .ok_or(AuthError::NoPendingNonce)?;

        let age = Utc::now().signed_duration_since(pending.issued_at);
        if age.to_std().is_ok_and(|age| age > self.ttl) {
            self.store.clear_if_matches(&identity, &pending.value).await;
            return Err(AuthError::NonceExpired);
        }

        self.verifier
            .verify(wallet, address, &auth_message(&pending.value), signature)?;

        // A concurrent login with the same nonce may have won the race.
        if !self.store.clear_if_matches(&identity, &pending.value).await {
            return Err(AuthError::NonceConsumed);
        }
        tracing::info!(address = %address.trim(), wallet = %wallet, "wallet login verified");
        Ok(())
    }
}
