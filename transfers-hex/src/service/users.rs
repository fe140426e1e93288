//! User registration and lookup.

use std::sync::Arc;

use tracing::{info, instrument};

use transfers_repo::security::hash_password;
use transfers_types::{AccountRepository, AppError, CreateUserRequest, NewUser, User, UserId};

/// Application service for user accounts.
///
/// Generic over the repository so tests can inject an in-memory one.
pub struct UserService<R: AccountRepository> {
    repo: Arc<R>,
}

impl<R: AccountRepository> UserService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Validates the request, hashes the password and persists the user.
    ///
    /// Roles are derived from the user type, never taken from input.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User, AppError> {
        let registration = req.validate().map_err(AppError::Validation)?;

        let password_hash = hash_password(&registration.password)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

        let user = User::new(NewUser {
            full_name: registration.full_name,
            email: registration.email,
            password_hash,
            document: registration.document,
            wallet: registration.wallet,
            type_user: registration.type_user,
        });

        self.repo.create_user(&user).await?;
        info!(user_id = %user.id, type_user = user.type_user.as_str(), "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user not found: {}", id)))
    }
}
