//! Account repository port.

use crate::domain::{Money, User, UserId};
use crate::error::RepoError;

/// Storage of users and their embedded wallets.
#[async_trait::async_trait]
pub trait AccountRepository: Send + Sync + 'static {
    /// Persists a new user. Duplicate email or document yields `RepoError::Conflict`.
    async fn create_user(&self, user: &User) -> Result<(), RepoError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError>;

    /// Overwrites the wallet balance of `id`. `RepoError::NotFound` if no such user.
    async fn update_balance(&self, id: UserId, balance: Money) -> Result<(), RepoError>;
}
