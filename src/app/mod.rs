pub mod bootstrap;
pub mod intents;
pub mod relay;
pub mod sync_service;
pub mod watcher;

pub use bootstrap::{BootstrapInitializer, BootstrapOutcome};
pub use intents::{PreparedTransaction, TxIntent};
pub use relay::{PendingTransaction, TransactionRelay};
pub use sync_service::ChainSync;
pub use watcher::{ConfirmationState, ConfirmationWatcher, WatchPolicy};
