//! Durable transfer notifications.
//!
//! `OutboxNotifier` is the producer side: it implements the `Notifier` port by
//! writing the serialized transfer to the `notification_queue` table.
//! `NotificationWorker` is the consumer side: it drains a queue and POSTs each
//! payload to a configured URL.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use transfers_types::{NotificationError, Notifier, RepoError, Transfer};

use crate::Repo;
use crate::security::sign_payload;

/// Queue transfers are published on unless configured otherwise.
pub const DEFAULT_QUEUE: &str = "notify";

/// Header carrying the hex HMAC-SHA256 of the body.
pub const SIGNATURE_HEADER: &str = "X-Signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Processing,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::Processing => "PROCESSING",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DeliveryStatus::Pending),
            "PROCESSING" => Ok(DeliveryStatus::Processing),
            "DELIVERED" => Ok(DeliveryStatus::Delivered),
            "FAILED" => Ok(DeliveryStatus::Failed),
            other => Err(RepoError::Database(format!(
                "Unknown delivery status: {}",
                other
            ))),
        }
    }
}

/// A message sitting in the notification queue. The payload is opaque bytes.
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub id: Uuid,
    pub queue: String,
    pub payload: Vec<u8>,
    pub status: DeliveryStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Producer
// ─────────────────────────────────────────────────────────────────────────────

/// Publishes committed transfers to a named queue.
pub struct OutboxNotifier {
    repo: Repo,
    queue: String,
}

impl OutboxNotifier {
    pub fn new(repo: Repo, queue: impl Into<String>) -> Self {
        Self {
            repo,
            queue: queue.into(),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    #[instrument(skip(self, transfer), fields(transfer_id = %transfer.id, queue = %self.queue))]
    async fn notify(&self, transfer: &Transfer) -> Result<(), NotificationError> {
        let payload =
            serde_json::to_vec(transfer).map_err(|e| NotificationError::Serialize(e.to_string()))?;

        let id = self
            .repo
            .enqueue_notification(&self.queue, &payload)
            .await
            .map_err(|e| NotificationError::Enqueue(e.to_string()))?;

        info!(message_id = %id, "transfer notification enqueued");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Consumer
// ─────────────────────────────────────────────────────────────────────────────

pub struct NotificationWorker {
    repo: Repo,
    client: reqwest::Client,
    target_url: String,
    queue: String,
    secret: Option<String>,
    poll_interval: Duration,
    timeout: Duration,
    batch_size: i64,
    max_attempts: i32,
}

impl NotificationWorker {
    pub fn new(repo: Repo, target_url: String) -> Self {
        Self {
            repo,
            client: reqwest::Client::new(),
            target_url,
            queue: DEFAULT_QUEUE.to_string(),
            secret: None,
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
            batch_size: 10,
            max_attempts: 5,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Signs every delivery with HMAC-SHA256 under `secret`.
    pub fn with_secret(mut self, secret: Option<String>) -> Self {
        self.secret = secret;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Bounds each delivery; a consumer that never answers counts as a failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[instrument(skip(self), fields(queue = %self.queue))]
    pub async fn run(self) {
        info!("Starting notification worker sending to {}", self.target_url);
        loop {
            if let Err(e) = self.run_once().await {
                error!("Failed to fetch notifications: {}", e);
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Delivers one batch. Returns how many messages were attempted.
    pub async fn run_once(&self) -> Result<usize, RepoError> {
        let batch = self
            .repo
            .claim_notifications(&self.queue, self.batch_size, self.max_attempts)
            .await?;

        if !batch.is_empty() {
            info!("Processing {} pending notifications", batch.len());
        }
        let count = batch.len();
        for message in batch {
            self.deliver(message).await;
        }
        Ok(count)
    }

    #[instrument(skip(self, message), fields(message_id = %message.id, attempt = message.attempts + 1))]
    async fn deliver(&self, message: QueuedNotification) {
        let mut request = self
            .client
            .post(&self.target_url)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Notification-Id", message.id.to_string());
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(&message.payload, secret));
        }

        let result = request.body(message.payload).send().await;

        let (status, last_error) = match result {
            Ok(resp) if resp.status().is_success() => (DeliveryStatus::Delivered, None),
            Ok(resp) => (
                DeliveryStatus::Failed,
                Some(format!("HTTP {}", resp.status())),
            ),
            Err(e) => (DeliveryStatus::Failed, Some(e.to_string())),
        };

        if let Some(reason) = &last_error {
            warn!(%reason, "notification delivery failed");
        }

        if let Err(e) = self
            .repo
            .mark_notification(message.id, status, last_error)
            .await
        {
            error!("Failed to update notification status: {}", e);
        }
    }
}
