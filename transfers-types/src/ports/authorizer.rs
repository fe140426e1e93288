//! External authorization port.

use tokio::time::Instant;

use crate::domain::Transfer;
use crate::error::AuthorizationError;

/// Asks an external policy service whether a transfer may proceed.
///
/// Implementations fail closed: anything other than an explicit approval is
/// an error. `deadline` bounds the total time spent, retries included.
#[async_trait::async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(
        &self,
        transfer: &Transfer,
        deadline: Option<Instant>,
    ) -> Result<(), AuthorizationError>;
}
