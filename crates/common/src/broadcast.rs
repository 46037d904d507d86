//! Broadcast channel — Redis pub/sub fanout across gateway processes.
//!
//! Intentionally weak guarantees: at-most-once, no persistence, no replay,
//! no delivery confirmation. A publish with zero subscribers succeeds and the
//! event is gone; the durable notification record is the fallback that makes
//! this acceptable.

use redis::aio::ConnectionManager;

use crate::types::NotificationPayload;

/// Channel every gateway process subscribes to.
pub const EVENTS_CHANNEL: &str = "courier:events";

/// Publish a notification event to all subscribed gateway processes.
///
/// Returns the number of subscribers the Redis server delivered to, which is
/// informational only — zero is not an error.
pub async fn publish(
    redis: &mut ConnectionManager,
    payload: &NotificationPayload,
) -> anyhow::Result<u64> {
    let body = serde_json::to_string(payload)?;

    let receivers: u64 = redis::cmd("PUBLISH")
        .arg(EVENTS_CHANNEL)
        .arg(&body)
        .query_async(redis)
        .await?;

    tracing::debug!(
        user_id = %payload.user_id,
        receivers,
        "Published notification event"
    );

    Ok(receivers)
}
