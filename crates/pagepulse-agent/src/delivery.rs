use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use pagepulse_core::event::{serialize_batch, QueuedEvent};

/// Outbound transport to the collector.
///
/// `send_beacon` models an unload-safe fire-and-forget primitive: once the
/// runtime accepts the payload, delivery is assumed and no custom headers
/// travel with it. Runtimes without one leave the default in place and the
/// channel falls back to the standard asynchronous `send`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Hand `body` to the runtime's unload-safe primitive. Returns true when
    /// the payload was accepted. Unsupported by default.
    fn send_beacon(&self, _endpoint: &Url, _body: &[u8]) -> bool {
        false
    }

    /// Standard asynchronous POST with a JSON content type.
    async fn send(&self, endpoint: &Url, body: Vec<u8>) -> anyhow::Result<()>;
}

/// Reqwest-backed fallback transport. Short timeouts: a slow collector must
/// not pin batches in flight while the page is going away.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: &Url, body: Vec<u8>) -> anyhow::Result<()> {
        let response = self
            .client
            .post(endpoint.clone())
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("collector responded with status {}", response.status());
        }
        Ok(())
    }
}

/// Transmits batches to the configured endpoint. Failures never propagate as
/// errors — the untouched batch comes back to the caller for front-requeue,
/// and the next flush cycle retries opportunistically.
pub struct DeliveryChannel {
    endpoint: Url,
    debug_log: bool,
    transport: Arc<dyn Transport>,
}

impl DeliveryChannel {
    pub fn new(endpoint: Url, debug_log: bool, transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint,
            debug_log,
            transport,
        }
    }

    /// Serialize and send `batch`, insertion order preserved. On any failure
    /// (serialization included) the original batch is returned so the caller
    /// can re-queue it.
    pub async fn transmit(&self, batch: Vec<QueuedEvent>) -> Result<(), Vec<QueuedEvent>> {
        let body = match serialize_batch(&batch) {
            Ok(body) => body,
            Err(error) => {
                self.log_failure(batch.len(), &error.to_string());
                return Err(batch);
            }
        };

        if self.transport.send_beacon(&self.endpoint, &body) {
            debug!(count = batch.len(), "batch handed to beacon transport");
            return Ok(());
        }

        match self.transport.send(&self.endpoint, body).await {
            Ok(()) => {
                debug!(count = batch.len(), "batch delivered");
                Ok(())
            }
            Err(error) => {
                self.log_failure(batch.len(), &error.to_string());
                Err(batch)
            }
        }
    }

    fn log_failure(&self, count: usize, error: &str) {
        if self.debug_log {
            warn!(count, error, "batch delivery failed; events re-queued");
        } else {
            debug!(count, error, "batch delivery failed; events re-queued");
        }
    }
}
