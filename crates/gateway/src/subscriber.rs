//! Shared subscriber loop — one per gateway process.
//!
//! Consumes the broadcast channel and fans each event out through the
//! connection registry. Losing the Redis connection degrades real-time
//! delivery only (records stay durable), so the loop reconnects forever
//! with capped exponential backoff instead of taking the process down.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use courier_common::broadcast::EVENTS_CHANNEL;
use courier_common::types::{NotificationPayload, ServerEvent};

use crate::registry::ConnectionRegistry;

const INITIAL_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SECS: u64 = 30;

/// Run the subscriber loop until the task is cancelled.
pub async fn run_subscriber(redis_url: String, registry: Arc<ConnectionRegistry>) {
    let mut backoff = INITIAL_BACKOFF_SECS;
    loop {
        match subscribe_once(&redis_url, &registry).await {
            Ok(()) => unreachable!("subscribe_once only returns on error"),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    retry_in_secs = backoff,
                    "Broadcast subscription lost, reconnecting"
                );
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
            }
        }
    }
}

/// Subscribe and pump messages until the connection drops.
async fn subscribe_once(
    redis_url: &str,
    registry: &Arc<ConnectionRegistry>,
) -> anyhow::Result<()> {
    // Pub/sub needs its own dedicated connection; the shared manager cannot
    // enter subscribe mode.
    let client = redis::Client::open(redis_url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(EVENTS_CHANNEL).await?;
    tracing::info!(channel = EVENTS_CHANNEL, "Subscribed to broadcast channel");

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let body: String = msg.get_payload()?;
        let payload = match serde_json::from_str::<NotificationPayload>(&body) {
            Ok(payload) => payload,
            Err(e) => {
                // A publish we cannot parse is dropped; the durable record
                // still exists on the worker side.
                tracing::warn!(error = %e, "Malformed broadcast event, skipping");
                continue;
            }
        };

        let frame = serde_json::to_string(&ServerEvent::notification(&payload))?;
        let forwarded = registry.dispatch(&payload.user_id, &frame);
        tracing::debug!(
            user_id = %payload.user_id,
            forwarded,
            "Broadcast event dispatched"
        );
    }

    anyhow::bail!("broadcast message stream ended")
}
