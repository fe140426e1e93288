//! `Authorizer` port backed by an HTTP policy service.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use transfers_types::{AuthorizationError, Authorizer, Transfer};

use crate::client::{RetryError, RetryingClient};
use crate::policy::RetryPolicy;
use crate::transport::{HttpTransport, ReqwestTransport};

/// The only answer that approves a transfer.
pub const APPROVED_MESSAGE: &str = "Autorizado";

#[derive(Debug, Deserialize)]
struct PolicyAnswer {
    #[serde(rename = "Message", alias = "message")]
    message: String,
}

pub struct HttpAuthorizer<T = ReqwestTransport> {
    uri: String,
    client: RetryingClient<T>,
}

impl HttpAuthorizer<ReqwestTransport> {
    pub fn new(uri: impl Into<String>, policy: RetryPolicy) -> Self {
        Self::with_transport(uri, ReqwestTransport::default(), policy)
    }
}

impl<T: HttpTransport> HttpAuthorizer<T> {
    pub fn with_transport(uri: impl Into<String>, transport: T, policy: RetryPolicy) -> Self {
        Self {
            uri: uri.into(),
            client: RetryingClient::new(transport, policy),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.client.policy()
    }
}

#[async_trait]
impl<T: HttpTransport + 'static> Authorizer for HttpAuthorizer<T> {
    #[instrument(skip(self, transfer, deadline), fields(transfer_id = %transfer.id, payer_id = %transfer.payer_id))]
    async fn authorize(
        &self,
        transfer: &Transfer,
        deadline: Option<Instant>,
    ) -> Result<(), AuthorizationError> {
        let response = match self.client.get(&self.uri, deadline).await {
            Ok(response) => response,
            Err(e @ RetryError::Exhausted { .. }) => {
                warn!(error = %e, "authorizer unavailable");
                return Err(AuthorizationError::Failed(e.to_string()));
            }
            Err(RetryError::Permanent(e)) => {
                warn!(error = %e, "authorizer unreachable");
                return Err(AuthorizationError::Denied(e.to_string()));
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "authorizer refused");
            return Err(AuthorizationError::Denied(format!(
                "authorizer answered HTTP {}",
                response.status
            )));
        }

        let answer: PolicyAnswer = serde_json::from_slice(&response.body).map_err(|e| {
            warn!(error = %e, "unreadable authorizer answer");
            AuthorizationError::Denied(format!("unreadable authorizer answer: {}", e))
        })?;

        if answer.message != APPROVED_MESSAGE {
            warn!(message = %answer.message, "transfer not authorized");
            return Err(AuthorizationError::Denied(format!(
                "authorizer answered {:?}",
                answer.message
            )));
        }

        info!("transfer authorized");
        Ok(())
    }
}
