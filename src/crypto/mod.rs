pub mod hashing;
pub mod nonce;
pub mod signature;

pub use nonce::{AuthChallenge, AuthError, InMemoryNonceStore, NonceStore, WalletAuthenticator};
pub use signature::{SignatureError, SignatureVerifier, WalletType};
