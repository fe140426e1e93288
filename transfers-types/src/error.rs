//! Error types for the transfer service.

use crate::domain::{Currency, DocumentType, UserId};

/// Domain-level errors (business rule violations).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: Currency, got: Currency },

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("invalid type user: {0}")]
    InvalidTypeUser(String),

    #[error("invalid document type: {0}")]
    InvalidDocumentType(String),

    #[error("invalid {kind}: {value}")]
    InvalidDocument { kind: DocumentType, value: String },

    #[error("user {0} is not allowed to transfer")]
    RoleNotAllowed(UserId),

    #[error("balance overflow: {balance} + {amount}")]
    BalanceOverflow { balance: i64, amount: i64 },
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Outcome of a failed authorization check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizationError {
    /// The policy service answered and refused, or answered with something
    /// that cannot be read as an approval.
    #[error("transfer not authorized: {0}")]
    Denied(String),

    /// No definitive answer within the retry policy.
    #[error("authorization unavailable: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("failed to serialize notification: {0}")]
    Serialize(String),

    #[error("failed to enqueue notification: {0}")]
    Enqueue(String),
}

/// Reasons a transfer aborts. Every variant means no money moved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("transfer value must be greater than zero")]
    InvalidValue,

    #[error("payer and payee must be different users")]
    SelfTransfer,

    #[error("payer not found: {0}")]
    PayerNotFound(UserId),

    #[error("payee not found: {0}")]
    PayeeNotFound(UserId),

    #[error("user {0} is not allowed to transfer")]
    RoleNotAllowed(UserId),

    #[error("user does not have sufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("wallet holds {wallet}, transfer is in {value}")]
    CurrencyMismatch { wallet: Currency, value: Currency },

    #[error("payee wallet cannot receive {requested}: balance {balance} would overflow")]
    PayeeOverflow { balance: i64, requested: i64 },

    #[error("transfer not authorized: {0}")]
    AuthorizationDenied(String),

    #[error("authorization unavailable: {0}")]
    AuthorizationFailed(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<AuthorizationError> for TransferError {
    fn from(err: AuthorizationError) -> Self {
        match err {
            AuthorizationError::Denied(reason) => TransferError::AuthorizationDenied(reason),
            AuthorizationError::Failed(reason) => TransferError::AuthorizationFailed(reason),
        }
    }
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// One or more input problems, all reported together.
    #[error("Bad request: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::Validation(vec![msg.into()])
    }

    /// Messages for the `{"errors": [...]}` body.
    pub fn messages(&self) -> Vec<String> {
        match self {
            AppError::Validation(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InsufficientBalance {
                available,
                requested,
            } => AppError::InsufficientBalance {
                available,
                requested,
            },
            DomainError::RoleNotAllowed(id) => {
                AppError::Forbidden(format!("user {} is not allowed to transfer", id))
            }
            e => AppError::bad_request(e.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Conflict(e),
        }
    }
}

impl From<TransferError> for AppError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::InvalidValue
            | TransferError::SelfTransfer
            | TransferError::CurrencyMismatch { .. }
            | TransferError::PayeeOverflow { .. } => {
                AppError::bad_request(err.to_string())
            }
            TransferError::PayerNotFound(_) | TransferError::PayeeNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            TransferError::RoleNotAllowed(_) | TransferError::AuthorizationDenied(_) => {
                AppError::Forbidden(err.to_string())
            }
            TransferError::InsufficientBalance {
                available,
                requested,
            } => AppError::InsufficientBalance {
                available,
                requested,
            },
            TransferError::AuthorizationFailed(reason) => AppError::Unavailable(reason),
            TransferError::Storage(reason) => AppError::Internal(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_errors_map_to_app_errors() {
        let id = UserId::new();
        assert!(matches!(
            AppError::from(TransferError::PayeeOverflow {
                balance: i64::MAX,
                requested: 1
            }),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(TransferError::SelfTransfer),
            AppError::Validation(_)
        ));
        assert!(matches!(
            AppError::from(TransferError::PayeeNotFound(id)),
            AppError::NotFound(msg) if msg.contains(&id.to_string())
        ));
        assert!(matches!(
            AppError::from(TransferError::RoleNotAllowed(id)),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(TransferError::AuthorizationDenied("Negado".into())),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(TransferError::AuthorizationFailed("timeout".into())),
            AppError::Unavailable(_)
        ));
        assert!(matches!(
            AppError::from(TransferError::Storage("boom".into())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn test_authorization_error_conversion() {
        assert_eq!(
            TransferError::from(AuthorizationError::Denied("x".into())),
            TransferError::AuthorizationDenied("x".into())
        );
        assert_eq!(
            TransferError::from(AuthorizationError::Failed("y".into())),
            TransferError::AuthorizationFailed("y".into())
        );
    }

    #[test]
    fn test_validation_messages_are_kept_separate() {
        let err = AppError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.messages(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            AppError::Conflict("dup".into()).messages(),
            vec!["Conflict: dup".to_string()]
        );
    }
}
