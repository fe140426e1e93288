//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use transfers_types::{
    AccountRepository, DomainError, LedgerOp, Money, RepoError, Transfer, TransferId,
    TransferRepository, User, UserId,
};

use crate::notifications::{DeliveryStatus, QueuedNotification};
use crate::types::{DbNotification, DbTransfer, DbUser, DbWallet, parse_currency};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository with row-level locking.
#[derive(Clone)]
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_tables_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_notification_queue_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger operations (run on a locked transaction connection)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Side {
    Debit,
    Credit,
}

/// Explains why a guarded wallet update matched no row.
async fn wallet_miss(
    conn: &mut PgConnection,
    account: UserId,
    amount: Money,
    side: Side,
) -> Result<RepoError, RepoError> {
    let row: Option<DbWallet> =
        sqlx::query_as(r#"SELECT wallet_amount, wallet_currency FROM users WHERE id = $1"#)
            .bind(account.into_uuid())
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

async fn debit(conn: &mut PgConnection, account: UserId, amount: Money) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"UPDATE users SET wallet_amount = wallet_amount - $1
           WHERE id = $2 AND wallet_amount >= $1 AND wallet_currency = $3"#,
    )
    .bind(amount.amount())
    .bind(account.into_uuid())
    .bind(amount.currency().code())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(wallet_miss(conn, account, amount, Side::Debit).await?);
    }
    Ok(())
}

async fn credit(conn: &mut PgConnection, account: UserId, amount: Money) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"UPDATE users SET wallet_amount = wallet_amount + $1
           WHERE id = $2 AND wallet_currency = $3
             AND wallet_amount <= 9223372036854775807 - $1"#,
    )
    .bind(amount.amount())
    .bind(account.into_uuid())
    .bind(amount.currency().code())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(wallet_miss(conn, account, amount, Side::Credit).await?);
    }
    Ok(())
}

async fn insert_transfer(conn: &mut PgConnection, transfer: &Transfer) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO transfers (id, payer_id, payee_id, value, currency, created_at)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(transfer.id.into_uuid())
    .bind(transfer.payer_id.into_uuid())
    .bind(transfer.payee_id.into_uuid())
    .bind(transfer.value.amount())
    .bind(transfer.value.currency().code())
    .bind(transfer.created_at)
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AccountRepository for PostgresRepo {
    async fn create_user(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO users (id, full_name, email, password_hash, document_type, document_value,
                                  wallet_currency, wallet_amount, type_user, can_transfer, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(user.id.into_uuid())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.document.kind().as_str())
        .bind(user.document.value())
        .bind(user.wallet().currency().code())
        .bind(user.wallet().amount())
        .bind(user.type_user.as_str())
        .bind(user.roles.can_transfer)
        .bind(user.created_at)
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
               FROM users WHERE id = $1"#,
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbUser::into_domain).transpose()
    }

    async fn update_balance(&self, id: UserId, balance: Money) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"UPDATE users SET wallet_amount = $1, wallet_currency = $2 WHERE id = $3"#,
        )
        .bind(balance.amount())
        .bind(balance.currency().code())
        .bind(id.into_uuid())
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
impl TransferRepository for PostgresRepo {
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

        // Lock accounts in consistent order to prevent deadlocks
        let mut accounts: Vec<UserId> = ops.iter().filter_map(LedgerOp::account).collect();
        accounts.sort();
        accounts.dedup();
        for account in &accounts {
            sqlx::query(r#"SELECT id FROM users WHERE id = $1 FOR UPDATE"#)
                .bind(account.into_uuid())
                .fetch_optional(&mut *db_tx)
                .await
                .map_err(db_err)?;
        }

        for op in ops {
            match op {
                LedgerOp::Debit { account, amount } => debit(&mut *db_tx, account, amount).await?,
                LedgerOp::Credit { account, amount } => credit(&mut *db_tx, account, amount).await?,
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
               FROM transfers WHERE id = $1"#,
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(DbTransfer::into_domain).transpose()
    }

    async fn list_transfers_for_user(&self, user: UserId) -> Result<Vec<Transfer>, RepoError> {
        let rows: Vec<DbTransfer> = sqlx::query_as(
            r#"SELECT id, payer_id, payee_id, value, currency, created_at
               FROM transfers WHERE payer_id = $1 OR payee_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(user.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(DbTransfer::into_domain).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Notification queue (Internal)
// ─────────────────────────────────────────────────────────────────────────────
impl PostgresRepo {
    pub async fn enqueue_notification(
        &self,
        queue: &str,
        payload: &[u8],
    ) -> Result<Uuid, RepoError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"INSERT INTO notification_queue (id, queue, payload, status, created_at)
               VALUES ($1, $2, $3, 'PENDING', $4)"#,
        )
        .bind(id)
        .bind(queue)
        .bind(payload)
        .bind(Utc::now())
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
        // SKIP LOCKED lets several workers drain one queue
        let rows = sqlx::query_as::<_, DbNotification>(
            r#"
            UPDATE notification_queue SET status = 'PROCESSING'
            WHERE id IN (
                SELECT id FROM notification_queue
                WHERE queue = $1 AND status IN ('PENDING', 'FAILED') AND attempts < $2
                ORDER BY created_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
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
            SET status = $1, processed_at = $2, last_error = $3, attempts = attempts + 1
            WHERE id = $4
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(last_error)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}
