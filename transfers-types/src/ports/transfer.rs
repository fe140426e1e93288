//! Transfer repository port.
//!
//! Balance changes and the transfer record are committed together through
//! [`TransferRepository::run_in_transaction`].

use crate::domain::{Money, Transfer, TransferId, UserId};
use crate::error::RepoError;

/// One step of a ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    /// Decrement `account` by `amount` iff its balance covers it and the
    /// currency matches. Otherwise fails with `NotFound` or
    /// `Domain(InsufficientBalance)`.
    Debit { account: UserId, amount: Money },
    /// Increment `account` by `amount`.
    Credit { account: UserId, amount: Money },
    /// Append the transfer record.
    Record(Transfer),
}

impl LedgerOp {
    /// The account this operation touches, if any.
    pub fn account(&self) -> Option<UserId> {
        match self {
            LedgerOp::Debit { account, .. } | LedgerOp::Credit { account, .. } => Some(*account),
            LedgerOp::Record(_) => None,
        }
    }
}

/// Append-only storage of transfers plus the transactional ledger primitive.
#[async_trait::async_trait]
pub trait TransferRepository: Send + Sync + 'static {
    /// Inserts a single transfer record outside of any ledger transaction.
    async fn insert(&self, transfer: &Transfer) -> Result<(), RepoError>;

    /// Applies `ops` in order inside one storage transaction.
    ///
    /// Either every operation takes effect or none does; the first failing
    /// operation's error is returned after rollback.
    async fn run_in_transaction(&self, ops: Vec<LedgerOp>) -> Result<(), RepoError>;

    async fn find_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError>;

    /// Transfers where `user` is payer or payee, newest first.
    async fn list_transfers_for_user(&self, user: UserId) -> Result<Vec<Transfer>, RepoError>;
}
