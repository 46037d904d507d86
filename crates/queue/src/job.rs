use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue envelope wrapping a typed payload.
///
/// `attempts` is owned by the queue: it is incremented on every failed
/// delivery and is what decides between a retry and the dead list. The
/// payload itself is immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique id, assigned at enqueue time.
    pub id: Uuid,
    /// Job type discriminator, e.g. "notification".
    pub name: String,
    /// Opaque payload; the handler for `name` knows its shape.
    pub data: serde_json::Value,
    /// Delivery attempts so far.
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    pub fn new(name: &str, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            data,
            attempts: 0,
            enqueued_at: Utc::now(),
        }
    }
}
