//! # Transfers Client SDK
//!
//! A typed Rust client for the Transfers API.

use reqwest::Client;
use serde::de::DeserializeOwned;

use transfers_types::{
    CreateTransferRequest, CreateUserRequest, ErrorResponse, HealthResponse, TransferId,
    TransferResponse, UserId, UserResponse,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {}", .errors.join("; "))]
    Api { status: u16, errors: Vec<String> },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Transfers API client.
#[derive(Debug, Clone)]
pub struct TransfersClient {
    base_url: String,
    http: Client,
}

impl TransfersClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/health").await
    }

    /// Registers a user.
    pub async fn create_user(&self, req: &CreateUserRequest) -> Result<UserResponse, ClientError> {
        self.post("/users", req).await
    }

    /// Gets a user by ID.
    pub async fn get_user(&self, id: UserId) -> Result<UserResponse, ClientError> {
        self.get(&format!("/users/{}", id)).await
    }

    /// Lists transfers the user sent or received, newest first.
    pub async fn list_user_transfers(
        &self,
        id: UserId,
    ) -> Result<Vec<TransferResponse>, ClientError> {
        self.get(&format!("/users/{}/transfers", id)).await
    }

    /// Moves `value` centavos from `payer` to `payee`.
    pub async fn create_transfer(
        &self,
        payer: UserId,
        payee: UserId,
        value: i64,
    ) -> Result<TransferResponse, ClientError> {
        let req = CreateTransferRequest {
            payer_id: payer.to_string(),
            payee_id: payee.to_string(),
            value,
        };
        self.post("/transfers", &req).await
    }

    /// Gets a transfer by ID.
    pub async fn get_transfer(&self, id: TransferId) -> Result<TransferResponse, ClientError> {
        self.get(&format!("/transfers/{}", id)).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(api_error(status.as_u16(), &body))
        }
    }
}

/// Reads the `{"errors": [...]}` body, falling back to the raw text.
fn api_error(status: u16, body: &str) -> ClientError {
    let errors = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.errors,
        Err(_) if body.is_empty() => Vec::new(),
        Err(_) => vec![body.to_string()],
    };
    ClientError::Api { status, errors }
}
