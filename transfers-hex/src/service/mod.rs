//! Application services.
//!
//! Orchestrate domain operations through the repository, authorizer and
//! notifier ports. Contain NO infrastructure logic.

pub mod transfers;
pub mod users;

pub use transfers::TransferService;
pub use users::UserService;
