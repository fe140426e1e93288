//! # Transfers Hex
//!
//! Application services and HTTP adapter for the transfer service.
//!
//! ## Architecture
//!
//! - `service/` - Application services (user registration, transfer orchestration)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Services are generic over `R: AccountRepository + TransferRepository`;
//! the authorizer and notifier are injected as trait objects.

pub mod inbound;
pub mod openapi;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use inbound::HttpServer;
pub use service::{TransferService, UserService};
