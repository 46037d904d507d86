//! Integration tests for the broadcast → registry fanout path.
//!
//! Requires a running Redis with `REDIS_URL` set. Run with:
//!
//! ```bash
//! REDIS_URL="redis://localhost:6379" \
//!   cargo test -p courier-gateway --test integration -- --ignored --nocapture
//! ```

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use tokio::sync::mpsc;
use tokio::time::timeout;

use courier_common::broadcast;
use courier_common::types::NotificationPayload;
use courier_gateway::registry::ConnectionRegistry;
use courier_gateway::subscriber::run_subscriber;

async fn redis_conn() -> ConnectionManager {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let client = redis::Client::open(url).unwrap();
    ConnectionManager::new(client).await.unwrap()
}

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

fn payload(user: &str, message: &str) -> NotificationPayload {
    NotificationPayload {
        user_id: user.to_string(),
        message: message.to_string(),
        kind: "system".to_string(),
    }
}

/// Publish repeatedly until the subscriber has picked the event up, bounded
/// by the outer timeout. Subscription setup is asynchronous, so a single
/// publish can race it.
async fn recv_after_publish(
    redis: &mut ConnectionManager,
    event: &NotificationPayload,
    rx: &mut mpsc::Receiver<String>,
) -> String {
    timeout(Duration::from_secs(5), async {
        loop {
            broadcast::publish(redis, event).await.unwrap();
            match timeout(Duration::from_millis(200), rx.recv()).await {
                Ok(Some(frame)) => return frame,
                _ => continue,
            }
        }
    })
    .await
    .expect("subscriber should forward the event")
}

#[tokio::test]
#[ignore]
async fn test_published_event_reaches_registered_connection() {
    let registry = Arc::new(ConnectionRegistry::new());
    let subscriber = tokio::spawn(run_subscriber(redis_url(), registry.clone()));

    let (tx, mut rx) = mpsc::channel(8);
    registry.register("it-u1", tx);

    let mut redis = redis_conn().await;
    let frame = recv_after_publish(&mut redis, &payload("it-u1", "Order shipped"), &mut rx).await;

    // The forwarded frame carries message + type but never the routing id
    let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(json["event"], "notification");
    assert_eq!(json["data"]["message"], "Order shipped");
    assert_eq!(json["data"]["type"], "system");
    assert!(json["data"].get("userId").is_none());

    subscriber.abort();
}

#[tokio::test]
#[ignore]
async fn test_event_for_other_user_is_not_forwarded() {
    let registry = Arc::new(ConnectionRegistry::new());
    let subscriber = tokio::spawn(run_subscriber(redis_url(), registry.clone()));

    let (tx_mine, mut rx_mine) = mpsc::channel(8);
    let (tx_other, mut rx_other) = mpsc::channel(8);
    registry.register("it-u2", tx_mine);
    registry.register("it-u3", tx_other);

    let mut redis = redis_conn().await;
    recv_after_publish(&mut redis, &payload("it-u2", "only mine"), &mut rx_mine).await;

    // The non-matching registry entry saw nothing
    assert!(rx_other.try_recv().is_err());

    subscriber.abort();
}
