use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Common fields every queued event carries, snapshotted at enqueue time.
///
/// Snapshotting per event (rather than patching shared fields at flush time)
/// keeps a batch consistent even when page state changes between enqueue and
/// transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseData {
    pub app_id: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    /// ISO-8601 UTC capture time.
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub visitor_id: String,
}

/// Event-specific fields. Wire field "event_type" tags the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "lowercase")]
pub enum EventPayload {
    Pageview {
        /// Effective visible dwell time for the page being left, in ms.
        session_duration: u64,
        page_url: String,
        page_title: String,
        page_referrer: String,
    },
    Event {
        category: String,
        action: String,
        label: Option<String>,
        value: Option<f64>,
    },
}

/// One observation awaiting delivery: the common snapshot merged with the
/// event-specific fields into a single flat JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEvent {
    #[serde(flatten)]
    pub base: BaseData,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Serialize a batch for the wire: a JSON array of flat event objects,
/// insertion order preserved.
pub fn serialize_batch(batch: &[QueuedEvent]) -> Result<Vec<u8>, CoreError> {
    Ok(serde_json::to_vec(batch)?)
}
