pub mod account;
pub mod address;
pub mod stage;

pub use address::{derive, AccountKind, DerivedAccount, ProgramAddress};
pub use stage::{ChainInstruction, Stage};
