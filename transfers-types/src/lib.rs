//! # Transfers Types
//!
//! Domain types and port traits for the peer-to-peer transfer service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Money, Wallet, User, Transfer)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    Currency, Document, DocumentType, Money, NewUser, Roles, Transfer, TransferId, TypeUser, User,
    UserId, Wallet,
};
pub use dto::*;
pub use error::{
    AppError, AuthorizationError, DomainError, NotificationError, RepoError, TransferError,
};
pub use ports::{AccountRepository, Authorizer, LedgerOp, Notifier, TransferRepository};
