//! Transfer orchestration.
//!
//! A transfer moves through these steps, any of which may abort it:
//!
//! 1. input checks (positive value, distinct parties)
//! 2. payer and payee loaded
//! 3. eligibility: role gate, then balance on the loaded snapshot
//! 4. external authorization, bounded by the authorization budget
//! 5. debit, credit and record committed in one storage transaction
//!
//! Once committed, the transfer is handed to the notifier on a background
//! task. Notification failures are logged and never undo the transfer.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{Instrument, error, info, instrument, warn};

use transfers_types::{
    AccountRepository, AppError, Authorizer, DomainError, LedgerOp, Notifier, RepoError, Transfer,
    TransferCommand, TransferError, TransferId, TransferRepository, User, UserId,
};

pub struct TransferService<R> {
    repo: Arc<R>,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn Notifier>,
    auth_budget: Option<Duration>,
}

impl<R> TransferService<R>
where
    R: AccountRepository + TransferRepository,
{
    pub fn new(repo: Arc<R>, authorizer: Arc<dyn Authorizer>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            repo,
            authorizer,
            notifier,
            auth_budget: None,
        }
    }

    /// Caps the total time spent in authorization, retries included.
    pub fn with_auth_budget(mut self, budget: Duration) -> Self {
        self.auth_budget = Some(budget);
        self
    }

    #[instrument(
        skip(self, cmd),
        fields(payer_id = %cmd.payer_id, payee_id = %cmd.payee_id, value = cmd.value.amount())
    )]
    pub async fn transfer(&self, cmd: TransferCommand) -> Result<Transfer, TransferError> {
        if cmd.value.amount() <= 0 {
            return Err(TransferError::InvalidValue);
        }
        if cmd.payer_id == cmd.payee_id {
            return Err(TransferError::SelfTransfer);
        }

        let payer = self
            .load(cmd.payer_id)
            .await?
            .ok_or(TransferError::PayerNotFound(cmd.payer_id))?;
        let payee = self
            .load(cmd.payee_id)
            .await?
            .ok_or(TransferError::PayeeNotFound(cmd.payee_id))?;

        check_eligibility(&payer, &payee, &cmd)?;

        let transfer = Transfer::new(payer.id, payee.id, cmd.value);

        let deadline = self.auth_budget.map(|budget| Instant::now() + budget);
        self.authorizer.authorize(&transfer, deadline).await?;

        self.repo
            .run_in_transaction(vec![
                LedgerOp::Debit {
                    account: payer.id,
                    amount: transfer.value,
                },
                LedgerOp::Credit {
                    account: payee.id,
                    amount: transfer.value,
                },
                LedgerOp::Record(transfer.clone()),
            ])
            .await
            .map_err(ledger_error)?;

        info!(transfer_id = %transfer.id, "transfer committed");
        self.notify_in_background(transfer.clone());

        Ok(transfer)
    }

    pub async fn get_transfer(&self, id: TransferId) -> Result<Transfer, AppError> {
        self.repo
            .find_transfer(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transfer not found: {}", id)))
    }

    /// Transfers the user took part in, newest first.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Transfer>, AppError> {
        if self.repo.find_by_id(user).await?.is_none() {
            return Err(AppError::NotFound(format!("user not found: {}", user)));
        }
        Ok(self.repo.list_transfers_for_user(user).await?)
    }

    async fn load(&self, id: UserId) -> Result<Option<User>, TransferError> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(|e| TransferError::Storage(e.to_string()))
    }

    fn notify_in_background(&self, transfer: Transfer) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(
            async move {
                if let Err(e) = notifier.notify(&transfer).await {
                    error!(
                        transfer_id = %transfer.id,
                        payer_id = %transfer.payer_id,
                        payee_id = %transfer.payee_id,
                        error = %e,
                        "failed to publish transfer notification"
                    );
                }
            }
            .in_current_span(),
        );
    }
}

/// Role first, then balance. Nothing has been written when this fails.
fn check_eligibility(payer: &User, payee: &User, cmd: &TransferCommand) -> Result<(), TransferError> {
    payer
        .ensure_can_transfer()
        .map_err(|_| TransferError::RoleNotAllowed(payer.id))?;

    for wallet in [payer.balance(), payee.balance()] {
        if wallet.currency() != cmd.value.currency() {
            return Err(TransferError::CurrencyMismatch {
                wallet: wallet.currency(),
                value: cmd.value.currency(),
            });
        }
    }

    if !payer.balance().covers(&cmd.value) {
        return Err(TransferError::InsufficientBalance {
            available: payer.balance().amount(),
            requested: cmd.value.amount(),
        });
    }
    if payee.balance().checked_add(cmd.value).is_err() {
        return Err(TransferError::PayeeOverflow {
            balance: payee.balance().amount(),
            requested: cmd.value.amount(),
        });
    }
    Ok(())
}

fn ledger_error(err: RepoError) -> TransferError {
    match err {
        RepoError::Domain(DomainError::InsufficientBalance {
            available,
            requested,
        }) => {
            warn!(available, requested, "balance changed before commit");
            TransferError::InsufficientBalance {
                available,
                requested,
            }
        }
        RepoError::Domain(DomainError::CurrencyMismatch { expected, got }) => {
            TransferError::CurrencyMismatch {
                wallet: expected,
                value: got,
            }
        }
        RepoError::Domain(DomainError::BalanceOverflow { balance, amount }) => {
            TransferError::PayeeOverflow {
                balance,
                requested: amount,
            }
        }
        other => TransferError::Storage(other.to_string()),
    }
}
