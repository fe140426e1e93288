//! Domain models for the transfer service.

pub mod money;
pub mod transfer;
pub mod user;
pub mod wallet;

pub use money::{Currency, Money};
pub use transfer::{Transfer, TransferId};
pub use user::{Document, DocumentType, NewUser, Roles, TypeUser, User, UserId};
pub use wallet::Wallet;
