//! Shared database row types with feature-gated fields for SQLite and PostgreSQL.
//!
//! PostgreSQL stores native `UUID` / `TIMESTAMPTZ`; SQLite stores both as
//! text. When both features are enabled PostgreSQL wins, matching `Repo`.

use sqlx::FromRow;

use transfers_types::{
    Currency, Document, DocumentType, Money, RepoError, Roles, Transfer, TransferId, TypeUser,
    User, UserId, Wallet,
};

use crate::notifications::{DeliveryStatus, QueuedNotification};

#[cfg(feature = "postgres")]
use chrono::{DateTime, Utc};
#[cfg(feature = "postgres")]
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// User row. The wallet is embedded as two columns.
#[derive(FromRow)]
pub struct DbUser {
    #[cfg(feature = "postgres")]
    pub id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub id: String,

    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub document_type: String,
    pub document_value: String,
    pub wallet_currency: String,
    pub wallet_amount: i64,
    pub type_user: String,
    pub can_transfer: bool,

    #[cfg(feature = "postgres")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "postgres"))]
    pub created_at: String,
}

#[derive(FromRow)]
pub struct DbTransfer {
    #[cfg(feature = "postgres")]
    pub id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub id: String,

    #[cfg(feature = "postgres")]
    pub payer_id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub payer_id: String,

    #[cfg(feature = "postgres")]
    pub payee_id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub payee_id: String,

    pub value: i64,
    pub currency: String,

    #[cfg(feature = "postgres")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "postgres"))]
    pub created_at: String,
}

/// Wallet columns only, used to explain a conditional update miss.
#[derive(FromRow)]
pub struct DbWallet {
    pub wallet_amount: i64,
    pub wallet_currency: String,
}

#[derive(FromRow)]
pub struct DbNotification {
    #[cfg(feature = "postgres")]
    pub id: Uuid,
    #[cfg(not(feature = "postgres"))]
    pub id: String,

    pub queue: String,
    pub payload: Vec<u8>,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,

    #[cfg(feature = "postgres")]
    pub created_at: DateTime<Utc>,
    #[cfg(not(feature = "postgres"))]
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<Currency, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown currency: {}", s)))
}

fn parse_type_user(s: &str) -> Result<TypeUser, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown user type: {}", s)))
}

fn parse_document_type(s: &str) -> Result<DocumentType, RepoError> {
    s.parse()
        .map_err(|_| RepoError::Database(format!("Unknown document type: {}", s)))
}

#[cfg(not(feature = "postgres"))]
fn parse_uuid(s: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

#[cfg(not(feature = "postgres"))]
fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    Ok(chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| RepoError::Database(e.to_string()))?
        .with_timezone(&chrono::Utc))
}

/// Text form used for SQLite timestamps. Fixed precision keeps lexical order
/// equal to chronological order.
#[cfg(not(feature = "postgres"))]
pub fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion (feature-gated implementations)
// ─────────────────────────────────────────────────────────────────────────────

impl DbUser {
    /// Convert database row to domain User.
    pub fn into_domain(self) -> Result<User, RepoError> {
        let currency = parse_currency(&self.wallet_currency)?;
        let wallet = Wallet::new(Money::new(self.wallet_amount, currency)?);
        let document = Document::new(
            parse_document_type(&self.document_type)?,
            self.document_value,
        )?;
        let type_user = parse_type_user(&self.type_user)?;

        #[cfg(feature = "postgres")]
        let (id, created_at) = (UserId::from_uuid(self.id), self.created_at);

        #[cfg(not(feature = "postgres"))]
        let (id, created_at) = (
            UserId::from_uuid(parse_uuid(&self.id)?),
            parse_timestamp(&self.created_at)?,
        );

        Ok(User::from_parts(
            id,
            self.full_name,
            self.email,
            self.password_hash,
            document,
            wallet,
            type_user,
            Roles {
                can_transfer: self.can_transfer,
            },
            created_at,
        ))
    }
}

impl DbTransfer {
    /// Convert database row to domain Transfer.
    pub fn into_domain(self) -> Result<Transfer, RepoError> {
        let value = Money::new(self.value, parse_currency(&self.currency)?)?;

        #[cfg(feature = "postgres")]
        let (id, payer_id, payee_id, created_at) = (
            TransferId::from_uuid(self.id),
            UserId::from_uuid(self.payer_id),
            UserId::from_uuid(self.payee_id),
            self.created_at,
        );

        #[cfg(not(feature = "postgres"))]
        let (id, payer_id, payee_id, created_at) = (
            TransferId::from_uuid(parse_uuid(&self.id)?),
            UserId::from_uuid(parse_uuid(&self.payer_id)?),
            UserId::from_uuid(parse_uuid(&self.payee_id)?),
            parse_timestamp(&self.created_at)?,
        );

        Ok(Transfer {
            id,
            payer_id,
            payee_id,
            value,
            created_at,
        })
    }
}

impl DbNotification {
    pub fn into_domain(self) -> Result<QueuedNotification, RepoError> {
        let status: DeliveryStatus = self.status.parse()?;

        #[cfg(feature = "postgres")]
        let (id, created_at) = (self.id, self.created_at);

        #[cfg(not(feature = "postgres"))]
        let (id, created_at) = (parse_uuid(&self.id)?, parse_timestamp(&self.created_at)?);

        Ok(QueuedNotification {
            id,
            queue: self.queue,
            payload: self.payload,
            status,
            attempts: self.attempts,
            last_error: self.last_error,
            created_at,
        })
    }
}
