use tokio::sync::Mutex;
use tracing::debug;

use pagepulse_core::config::DeliveryMode;
use pagepulse_core::event::QueuedEvent;

/// Ordered buffer of pending events.
///
/// The lock is held only long enough to append, `std::mem::take`, or splice —
/// never across a transmission — so enqueue and flush interleave without
/// blocking each other.
pub struct EventQueue {
    buffer: Mutex<Vec<QueuedEvent>>,
    batch_size: usize,
    delivery_mode: DeliveryMode,
}

impl EventQueue {
    pub fn new(batch_size: usize, delivery_mode: DeliveryMode) -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            batch_size,
            delivery_mode,
        }
    }

    /// Append an event. Returns true when the batch-size threshold fired and
    /// the caller should flush now. Single delivery mode never fires the
    /// threshold; those events leave on the interval timer or a page leave.
    pub async fn push(&self, event: QueuedEvent) -> bool {
        let mut buffer = self.buffer.lock().await;
        buffer.push(event);
        debug!(pending = buffer.len(), "event queued");
        self.delivery_mode == DeliveryMode::Batch && buffer.len() >= self.batch_size
    }

    /// Atomically take the full buffer contents, leaving it empty. Events
    /// enqueued while the snapshot is in flight accumulate separately.
    pub async fn take_all(&self) -> Vec<QueuedEvent> {
        let mut buffer = self.buffer.lock().await;
        std::mem::take(&mut *buffer)
    }

    /// Re-insert a failed batch at the front so chronological order holds
    /// against anything enqueued during the failed transmission.
    pub async fn requeue_front(&self, mut batch: Vec<QueuedEvent>) {
        let mut buffer = self.buffer.lock().await;
        batch.append(&mut *buffer);
        *buffer = batch;
    }

    pub async fn len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.lock().await.is_empty()
    }
}
