pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod telemetry;

// Convenience re-exports (keeps call-sites clean)
pub use app::{BootstrapOutcome, ChainSync, PreparedTransaction, TxIntent};
pub use crypto::{SignatureVerifier, WalletAuthenticator, WalletType};
pub use domain::{AccountKind, DerivedAccount, ProgramAddress, Stage};
pub use error::{BootstrapError, ErrorClass, SyncError};
pub use infra::config::SyncConfig;
pub use infra::solana;
