//! Everything that talks to the Solana cluster.

pub mod client;
pub mod ledger;

pub use client::RpcLedger;
pub use ledger::{Ledger, LedgerError, SignatureStatus};
