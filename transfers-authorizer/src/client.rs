//! Runs a [`RetryPolicy`] over an [`HttpTransport`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, warn};

use crate::policy::RetryPolicy;
use crate::transport::{HttpTransport, TransportError, TransportResponse};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    /// Every allowed attempt hit a retryable condition, or the deadline left
    /// no room for another one.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: String },

    /// A failure that retrying would not fix.
    #[error(transparent)]
    Permanent(TransportError),
}

pub struct RetryingClient<T> {
    transport: Arc<T>,
    policy: RetryPolicy,
}

impl<T> Clone for RetryingClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            policy: self.policy.clone(),
        }
    }
}

impl<T: HttpTransport> RetryingClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport: Arc::new(transport),
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GETs `url` until a non-retryable answer arrives.
    ///
    /// Responses with a status outside the retry list are returned as-is,
    /// success or not. Each attempt is capped by both the policy timeout and
    /// the time left before `deadline`.
    pub async fn get(
        &self,
        url: &str,
        deadline: Option<Instant>,
    ) -> Result<TransportResponse, RetryError> {
        let mut attempt = 0;
        let mut last = String::from("deadline reached before first attempt");

        while attempt < self.policy.max_attempts {
            let Some(budget) = self.attempt_budget(deadline) else {
                break;
            };
            attempt += 1;

            let outcome = match timeout(budget, self.transport.get(url, budget)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout),
            };

            match outcome {
                Ok(response) if self.policy.is_retryable_status(response.status) => {
                    warn!(attempt, status = response.status, "retryable status");
                    last = format!("HTTP {}", response.status);
                }
                Ok(response) => {
                    debug!(attempt, status = response.status, "response received");
                    return Ok(response);
                }
                Err(e) if e.is_transient() => {
                    warn!(attempt, error = %e, "transient failure");
                    last = e.to_string();
                }
                Err(e) => {
                    warn!(attempt, error = %e, "permanent failure");
                    return Err(RetryError::Permanent(e));
                }
            }

            if attempt == self.policy.max_attempts {
                break;
            }
            if let Some(deadline) = deadline {
                if Instant::now() + self.policy.delay >= deadline {
                    debug!(attempt, "deadline leaves no room for another attempt");
                    break;
                }
            }
            sleep(self.policy.delay).await;
        }

        Err(RetryError::Exhausted {
            attempts: attempt,
            last,
        })
    }

    fn attempt_budget(&self, deadline: Option<Instant>) -> Option<Duration> {
        match deadline {
            None => Some(self.policy.timeout),
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                (!left.is_zero()).then(|| left.min(self.policy.timeout))
            }
        }
    }
}
