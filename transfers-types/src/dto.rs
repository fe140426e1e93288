//! Data Transfer Objects (DTOs) for requests and responses.

use std::borrow::Cow;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::{
    Currency, Document, DocumentType, Money, Roles, Transfer, TransferId, TypeUser, User, UserId,
    Wallet,
};

// ─────────────────────────────────────────────────────────────────────────────
// Transfer DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to move money from a payer to a payee.
///
/// Ids arrive as text so that malformed values are reported together with
/// every other field problem instead of failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    #[schema(example = "0b6f0f4e-8a4d-4c43-9a2c-1f0a3c9e5d11")]
    pub payer_id: String,
    #[schema(example = "5d1c4a8e-2b7f-4e0c-8d3a-6c9b2e1f0a77")]
    pub payee_id: String,
    /// Amount in centavos (BRL)
    #[schema(example = 1000)]
    pub value: i64,
}

/// A transfer request whose fields parsed successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub payer_id: UserId,
    pub payee_id: UserId,
    pub value: Money,
}

impl CreateTransferRequest {
    /// Parses every field, collecting all problems.
    pub fn validate(&self) -> Result<TransferCommand, Vec<String>> {
        let mut errors = Vec::new();
        let payer_id = self
            .payer_id
            .parse::<UserId>()
            .map_err(|_| errors.push(format!("invalid payer_id: {}", self.payer_id)))
            .ok();
        let payee_id = self
            .payee_id
            .parse::<UserId>()
            .map_err(|_| errors.push(format!("invalid payee_id: {}", self.payee_id)))
            .ok();
        let value = Money::brl(self.value)
            .map_err(|e| errors.push(e.to_string()))
            .ok();

        match (payer_id, payee_id, value) {
            (Some(payer_id), Some(payee_id), Some(value)) if errors.is_empty() => {
                Ok(TransferCommand {
                    payer_id,
                    payee_id,
                    value,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Public projection of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    pub id: TransferId,
    pub payer_id: UserId,
    pub payee_id: UserId,
    /// Amount in centavos (BRL)
    #[schema(example = 1000)]
    pub value: i64,
    /// RFC 3339 timestamp
    #[schema(example = "2024-05-01T12:00:00Z")]
    pub created_at: String,
}

impl From<&Transfer> for TransferResponse {
    fn from(t: &Transfer) -> Self {
        Self {
            id: t.id,
            payer_id: t.payer_id,
            payee_id: t.payee_id,
            value: t.value.amount(),
            created_at: t.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentPayload {
    /// `CPF` or `CNPJ`
    #[serde(rename = "type")]
    #[schema(example = "CPF")]
    pub kind: String,
    #[schema(example = "123.456.789-09")]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletPayload {
    #[schema(example = "BRL")]
    pub currency: String,
    /// Opening balance in minor units
    #[schema(example = 10000)]
    pub amount: i64,
}

/// Request to register a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateUserRequest {
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "Maria Silva")]
    pub full_name: String,
    #[validate(email(message = "invalid email"))]
    #[schema(example = "maria@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
    pub document: DocumentPayload,
    pub wallet: WalletPayload,
    /// `COMMON` or `MERCHANT`, case-insensitive
    #[serde(rename = "type")]
    #[schema(example = "COMMON")]
    pub type_user: String,
}

/// A registration whose fields all validated. The password is still plain text.
#[derive(Debug, Clone)]
pub struct UserRegistration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub document: Document,
    pub wallet: Wallet,
    pub type_user: TypeUser,
}

impl CreateUserRequest {
    /// Validates every field, collecting all problems.
    pub fn validate(&self) -> Result<UserRegistration, Vec<String>> {
        let mut errors = match Validate::validate(self) {
            Ok(()) => Vec::new(),
            Err(field_errors) => messages(&field_errors),
        };
        let document = self
            .document
            .kind
            .parse::<DocumentType>()
            .and_then(|kind| Document::new(kind, self.document.value.clone()))
            .map_err(|e| errors.push(e.to_string()))
            .ok();
        let wallet = self
            .wallet
            .currency
            .parse::<Currency>()
            .and_then(|currency| Money::new(self.wallet.amount, currency))
            .map(Wallet::new)
            .map_err(|e| errors.push(e.to_string()))
            .ok();
        let type_user = self
            .type_user
            .parse::<TypeUser>()
            .map_err(|e| errors.push(e.to_string()))
            .ok();

        match (document, wallet, type_user) {
            (Some(document), Some(wallet), Some(type_user)) if errors.is_empty() => {
                Ok(UserRegistration {
                    full_name: self.full_name.trim().to_string(),
                    email: self.email.clone(),
                    password: self.password.clone(),
                    document,
                    wallet,
                    type_user,
                })
            }
            _ => Err(errors),
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed("full_name must not be empty"));
        return Err(error);
    }
    Ok(())
}

/// Flattens field errors into messages, ordered by field name.
fn messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("invalid {field}"),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    #[serde(rename = "type")]
    pub kind: DocumentType,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub currency: Currency,
    #[schema(example = 10000)]
    pub amount: i64,
}

/// Public projection of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub document: DocumentResponse,
    pub wallet: WalletResponse,
    pub roles: Roles,
    #[serde(rename = "type")]
    pub type_user: TypeUser,
    /// RFC 3339 timestamp
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name.clone(),
            email: u.email.clone(),
            document: DocumentResponse {
                kind: u.document.kind(),
                value: u.document.value().to_string(),
            },
            wallet: WalletResponse {
                currency: u.wallet().currency(),
                amount: u.wallet().amount(),
            },
            roles: u.roles,
            type_user: u.type_user,
            created_at: u.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Misc
// ─────────────────────────────────────────────────────────────────────────────

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = json!(["invalid payer_id: abc"]))]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "OK")]
    pub status: String,
}
