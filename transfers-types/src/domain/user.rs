//! User domain model.

use chrono::{DateTime, SubsecRound, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;
use super::wallet::Wallet;
use crate::error::DomainError;

/// Unique identifier for a User.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random UserId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of user. Merchants only receive money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeUser {
    Common,
    Merchant,
}

impl TypeUser {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeUser::Common => "COMMON",
            TypeUser::Merchant => "MERCHANT",
        }
    }
}

impl fmt::Display for TypeUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeUser {
    type Err = DomainError;

    /// Case-insensitive: `merchant`, `Merchant` and `MERCHANT` are the same type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COMMON" => Ok(TypeUser::Common),
            "MERCHANT" => Ok(TypeUser::Merchant),
            _ => Err(DomainError::InvalidTypeUser(s.to_string())),
        }
    }
}

/// Capabilities derived from the user type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Roles {
    pub can_transfer: bool,
}

impl Roles {
    pub fn for_type(type_user: TypeUser) -> Self {
        Self {
            can_transfer: matches!(type_user, TypeUser::Common),
        }
    }
}

/// Brazilian tax document kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentType {
    Cpf,
    Cnpj,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Cpf => "CPF",
            DocumentType::Cnpj => "CNPJ",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CPF" => Ok(DocumentType::Cpf),
            "CNPJ" => Ok(DocumentType::Cnpj),
            other => Err(DomainError::InvalidDocumentType(other.to_string())),
        }
    }
}

/// A validated identity document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    kind: DocumentType,
    value: String,
}

impl Document {
    /// Validates the document value against its kind's format.
    ///
    /// CPF: `ddd.ddd.ddd-dd`, punctuation optional.
    /// CNPJ: `dd.ddd.ddd/dddd-dd`, punctuation optional, branch block not `0000`.
    pub fn new(kind: DocumentType, value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let valid = match kind {
            DocumentType::Cpf => cpf_regex().is_match(&value),
            DocumentType::Cnpj => cnpj_regex().is_match(&value),
        };
        if !valid {
            return Err(DomainError::InvalidDocument {
                kind,
                value: value.clone(),
            });
        }
        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> DocumentType {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

static CPF_RE: OnceLock<Regex> = OnceLock::new();
static CNPJ_RE: OnceLock<Regex> = OnceLock::new();

fn cpf_regex() -> &'static Regex {
    CPF_RE.get_or_init(|| {
        Regex::new(r"^[0-9]{3}\.?[0-9]{3}\.?[0-9]{3}-?[0-9]{2}$")
            .unwrap_or_else(|error| panic!("CPF regex failed to compile: {error}"))
    })
}

fn cnpj_regex() -> &'static Regex {
    CNPJ_RE.get_or_init(|| {
        // Branch block (the four digits after the slash) must not be 0000.
        let pattern =
            r"^[0-9]{2}\.?[0-9]{3}\.?[0-9]{3}/?(?:[0-9]{3}[1-9]|[0-9]{2}[1-9][0-9]|[0-9][1-9][0-9]{2}|[1-9][0-9]{3})-?[0-9]{2}$";
        Regex::new(pattern).unwrap_or_else(|error| panic!("CNPJ regex failed to compile: {error}"))
    })
}

/// Validated input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub document: Document,
    pub wallet: Wallet,
    pub type_user: TypeUser,
}

/// A registered user owning exactly one wallet.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub document: Document,
    wallet: Wallet,
    pub type_user: TypeUser,
    pub roles: Roles,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user, deriving its roles from the user type.
    pub fn new(input: NewUser) -> Self {
        Self {
            id: UserId::new(),
            full_name: input.full_name,
            email: input.email,
            password_hash: input.password_hash,
            document: input.document,
            wallet: input.wallet,
            type_user: input.type_user,
            roles: Roles::for_type(input.type_user),
            // storage keeps microseconds
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    /// Reconstructs a user from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: UserId,
        full_name: String,
        email: String,
        password_hash: String,
        document: Document,
        wallet: Wallet,
        type_user: TypeUser,
        roles: Roles,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            full_name,
            email,
            password_hash,
            document,
            wallet,
            type_user,
            roles,
            created_at,
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn balance(&self) -> Money {
        self.wallet.money()
    }

    pub fn ensure_can_transfer(&self) -> Result<(), DomainError> {
        if !self.roles.can_transfer {
            return Err(DomainError::RoleNotAllowed(self.id));
        }
        Ok(())
    }

    /// Takes `amount` out of the wallet. Refuses to overdraw.
    pub fn withdraw(&mut self, amount: Money) -> Result<(), DomainError> {
        self.wallet.money().checked_sub(amount)?;
        self.wallet.sub(amount.amount());
        Ok(())
    }

    pub fn deposit(&mut self, amount: Money) -> Result<(), DomainError> {
        self.wallet.money().checked_add(amount)?;
        self.wallet.add(amount.amount());
        Ok(())
    }
}
