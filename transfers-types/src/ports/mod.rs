//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod account;
mod authorizer;
mod notifier;
mod transfer;

pub use account::AccountRepository;
pub use authorizer::Authorizer;
pub use notifier::Notifier;
pub use transfer::{LedgerOp, TransferRepository};
