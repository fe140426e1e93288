//! Transfer domain model.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::Money;
use super::user::UserId;

/// Unique identifier for a Transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
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

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TransferId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A committed movement of money from a payer to a payee.
///
/// Transfers are append-only: once recorded they are never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub payer_id: UserId,
    pub payee_id: UserId,
    pub value: Money,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn new(payer_id: UserId, payee_id: UserId, value: Money) -> Self {
        Self {
            id: TransferId::new(),
            payer_id,
            payee_id,
            value,
            // storage keeps microseconds
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_payload_preserves_fields() {
        let transfer = Transfer::new(UserId::new(), UserId::new(), Money::brl(1250).unwrap());
        let bytes = serde_json::to_vec(&transfer).unwrap();
        let back: Transfer = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, transfer);

        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["payer_id"], transfer.payer_id.to_string());
        assert_eq!(json["value"]["amount"], 1250);
        assert_eq!(json["value"]["currency"], "BRL");
    }
}
