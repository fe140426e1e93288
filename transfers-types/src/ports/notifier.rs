//! Transfer notification port.

use crate::domain::Transfer;
use crate::error::NotificationError;

/// Publishes a committed transfer for downstream consumers.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, transfer: &Transfer) -> Result<(), NotificationError>;
}
