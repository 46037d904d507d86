use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The unit of work and the unit of delivery: who gets told what.
///
/// Immutable once enqueued — workers and gateways only ever read it. The
/// wire names (`userId`, `type`) match what the admin layer submits and what
/// the browser client expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Durable, queryable history of a delivered-or-attempted notification.
///
/// Append-only; the source of truth for "what happened". The pub/sub fanout
/// is only a liveness optimization layered on top of these rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// First frame a client must send after the WebSocket opens.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Frames the gateway pushes to a connected client. The routing `userId` is
/// consumed server-side and never re-sent.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ServerEvent {
    Notification { data: NotificationBody },
}

/// Body of a pushed `notification` event.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ServerEvent {
    /// Build the client-facing frame for a payload, dropping the routing id.
    pub fn notification(payload: &NotificationPayload) -> Self {
        ServerEvent::Notification {
            data: NotificationBody {
                message: payload.message.clone(),
                kind: payload.kind.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_names() {
        let payload = NotificationPayload {
            user_id: "u1".to_string(),
            message: "Order shipped".to_string(),
            kind: "system".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"userId": "u1", "message": "Order shipped", "type": "system"})
        );
    }

    #[test]
    fn test_client_join_frame() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"join","userId":"u42"}"#).unwrap();
        let ClientMessage::Join { user_id } = msg;
        assert_eq!(user_id, "u42");
    }

    #[test]
    fn test_server_event_drops_user_id() {
        let payload = NotificationPayload {
            user_id: "u1".to_string(),
            message: "hi".to_string(),
            kind: "alert".to_string(),
        };
        let json = serde_json::to_value(ServerEvent::notification(&payload)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event":"notification","data":{"message":"hi","type":"alert"}})
        );
        assert!(json.get("userId").is_none());
    }
}
