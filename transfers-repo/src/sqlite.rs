//! SQLite repository adapter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use transfers_types::{
    AccountRepository, DomainError, LedgerOp, Money, RepoError, Transfer, TransferId,
    TransferRepository, User, UserId,
};

use crate::notifications::{DeliveryStatus, QueuedNotification};
use crate::types::{
    DbNotification, DbTransfer, DbUser, DbWallet, format_timestamp, parse_currency,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
///
/// SQLite has no row locks; every guarded update is a single statement and
/// the writer lock of the database transaction serializes ledger operations.
#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // An in-memory database lives and dies with its connection.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 8 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let ddl_queue = include_str!("../migrations/0002_create_notification_queue.sql");
        sqlx::query(ddl_queue)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger operations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Side {
    Debit,
    Credit,
}

/// Explains why a guarded wallet update matched no row.
async fn wallet_miss(
    conn: &mut SqliteConnection,
    account: UserId,
    amount: Money,
    side: Side,
) -> Result<RepoError, RepoError> {
    let row: Option<DbWallet> =
        sqlx::query_as(r#"SELECT wallet_amount, wallet_currency FROM users WHERE id = ?"#)
            .bind(account.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;

    let Some(wallet) = row else {
        return Ok(RepoError::NotFound);
    };
    let currency = parse_currency(&wallet.wallet_currency)?;
    if currency != amount.currency() {
        return Ok(RepoError::Domain(DomainError::CurrencyMismatch {
            expected: currency,
            got: amount.currency(),
        }));
    }
    Ok(RepoError::Domain(match side {
        Side::Debit => DomainError::InsufficientBalance {
            available: wallet.wallet_amount,
            requested: amount.amount(),
        },
        Side::Credit => DomainError::BalanceOverflow {
            balance: wallet.wallet_amount,
            amount: amount.amount(),
        },
    }))
}

async fn debit(
    conn: &mut SqliteConnection,
    account: UserId,
    amount: Money,
) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"UPDATE users SET wallet_amount = wallet_amount - ?1
           WHERE id = ?2 AND wallet_amount >= ?1 AND wallet_currency = ?3"#,
    )
    .bind(amount.amount())
    .bind(account.to_string())
    .bind(amount.currency().code())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(wallet_miss(conn, account, amount, Side::Debit).await?);
    }
    Ok(())
}

async fn credit(
    conn: &mut SqliteConnection,
    account: UserId,
    amount: Money,
) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"UPDATE users SET wallet_amount = wallet_amount + ?1
           WHERE id = ?2 AND wallet_currency = ?3
             AND wallet_amount <= 9223372036854775807 - ?1"#,
    )
    .bind(amount.amount())
    .bind(account.to_string())
    .bind(amount.currency().code())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(wallet_miss(conn, account, amount, Side::Credit).await?);
    }
    Ok(())
}

async fn insert_transfer(
    conn: &mut SqliteConnection,
    transfer: &Transfer,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO transfers (id, payer_id, payee_id, value, currency, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(transfer.id.to_string())
    .bind(transfer.payer_id.to_string())
    .bind(transfer.payee_id.to_string())
    .bind(transfer.value.amount())
    .bind(transfer.value.currency().code())
    .bind(format_timestamp(&transfer.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountRepository for SqliteRepo {
    async fn create_user(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO users (id, full_name, email, password_hash, document_type, document_value,
                                  wallet_currency, wallet_amount, type_user, can_transfer, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.document.kind().as_str())
        .bind(user.document.value())
        .bind(user.wallet().currency().code())
        .bind(user.wallet().amount())
        .bind(user.type_user.as_str())
        .bind(user.roles.can_transfer)
        .bind(format_timestamp(&user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_unique_violation())
            {
                RepoError::Conflict("user with this email or document already exists".into())
            } else {
                db_err(e)
            }
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepoError> {
        let row: Option<DbUser> = sqlx::query_as(
            r#"SELECT id, full_name, email, password_hash, document_type, document_value,
                      wallet_currency, wallet_amount, type_user, can_transfer, created_at
               FROM users WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn update_balance(&self, id: UserId, balance: Money) -> Result<(), RepoError> {
        let result =
            sqlx::query(r#"UPDATE users SET wallet_amount = ?, wallet_currency = ? WHERE id = ?"#)
                .bind(balance.amount())
                .bind(balance.currency().code())
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl TransferRepository for SqliteRepo {
    async fn insert(&self, transfer: &Transfer) -> Result<(), RepoError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_transfer(&mut *conn, transfer).await
    }

    async fn run_in_transaction(&self, ops: Vec<LedgerOp>) -> Result<(), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        for op in ops {
            match op {
                LedgerOp::Debit { account, amount } => debit(&mut *db_tx, account, amount).await?,
                LedgerOp::Credit { account, amount } => {
                    credit(&mut *db_tx, account, amount).await?
                }
                LedgerOp::Record(transfer) => insert_transfer(&mut *db_tx, &transfer).await?,
            }
        }

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    async fn find_transfer(&self, id: TransferId) -> Result<Option<Transfer>, RepoError> {
        let row: Option<DbTransfer> = sqlx::query_as(
            r#"SELECT id, payer_id, payee_id, value, currency, created_at
               FROM transfers WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransfer::into_domain).transpose()
    }

    async fn list_transfers_for_user(&self, user: UserId) -> Result<Vec<Transfer>, RepoError> {
        let user_str = user.to_string();

        let rows: Vec<DbTransfer> = sqlx::query_as(
            r#"SELECT id, payer_id, payee_id, value, currency, created_at
               FROM transfers WHERE payer_id = ?1 OR payee_id = ?1
               ORDER BY created_at DESC, rowid DESC"#,
        )
        .bind(&user_str)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbTransfer::into_domain).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notification queue (Internal)
// ─────────────────────────────────────────────────────────────────────────────
impl SqliteRepo {
    pub async fn enqueue_notification(
        &self,
        queue: &str,
        payload: &[u8],
    ) -> Result<Uuid, RepoError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"INSERT INTO notification_queue (id, queue, payload, status, created_at)
               VALUES (?, ?, ?, 'PENDING', ?)"#,
        )
        .bind(id.to_string())
        .bind(queue)
        .bind(payload)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(id)
    }

    /// Claims up to `limit` deliverable messages, marking them `PROCESSING`.
    pub async fn claim_notifications(
        &self,
        queue: &str,
        limit: i64,
        max_attempts: i32,
    ) -> Result<Vec<QueuedNotification>, RepoError> {
        let rows = sqlx::query_as::<_, DbNotification>(
            r#"
            UPDATE notification_queue SET status = 'PROCESSING'
            WHERE id IN (
                SELECT id FROM notification_queue
                WHERE queue = ? AND status IN ('PENDING', 'FAILED') AND attempts < ?
                ORDER BY created_at ASC
                LIMIT ?
            )
            RETURNING id, queue, payload, status, attempts, last_error, created_at
            "#,
        )
        .bind(queue)
        .bind(max_attempts)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut claimed: Vec<QueuedNotification> = rows
            .into_iter()
            .map(DbNotification::into_domain)
            .collect::<Result<_, _>>()?;
        claimed.sort_by_key(|n| n.created_at);
        Ok(claimed)
    }

    pub async fn mark_notification(
        &self,
        id: Uuid,
        status: DeliveryStatus,
        last_error: Option<String>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE notification_queue
            SET status = ?, processed_at = ?, last_error = ?, attempts = attempts + 1
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(format_timestamp(&Utc::now()))
        .bind(last_error)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
