//! # Transfers Authorizer
//!
//! Outbound adapter for the external authorization service. The pieces are
//! split so each can be tested on its own:
//!
//! - [`RetryPolicy`]: how many attempts, which statuses retry, delay, timeout
//! - [`HttpTransport`]: one GET with a timeout ([`ReqwestTransport`] in production)
//! - [`RetryingClient`]: runs a policy over a transport within a deadline
//! - [`HttpAuthorizer`]: implements the `Authorizer` port on top of the client

pub mod authorizer;
pub mod client;
pub mod policy;
pub mod transport;

pub use authorizer::{APPROVED_MESSAGE, HttpAuthorizer};
pub use client::{RetryError, RetryingClient};
pub use policy::RetryPolicy;
pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse};
