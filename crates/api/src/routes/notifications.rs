//! Notification submission and history routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use courier_common::error::AppError;
use courier_common::payload;
use courier_common::types::NotificationRecord;
use courier_queue::{NOTIFICATION_JOB, enqueue};

use crate::state::AppState;

/// Maximum history rows served per request.
const HISTORY_LIMIT: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", post(submit_notification))
        .route("/api/notifications/{user_id}", get(notification_history))
}

/// POST /api/notifications — validate a `{userId, message, type}` request
/// and enqueue a delivery job.
///
/// Validation happens before anything touches the queue: a rejected payload
/// produces a 400 naming every offending field and enqueues nothing. A valid
/// one is durable in the queue by the time the 202 goes out.
async fn submit_notification(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let payload = payload::validated(&body)?;

    let mut redis = state.redis.clone();
    let job_id = enqueue(&mut redis, NOTIFICATION_JOB, &payload)
        .await
        .map_err(|e| AppError::Queue(e.to_string()))?;

    tracing::info!(
        job_id = %job_id,
        user_id = %payload.user_id,
        kind = %payload.kind,
        "Notification accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "jobId": job_id })),
    ))
}

/// GET /api/notifications/:user_id — persisted history for a user, newest
/// first.
///
/// This is the read path clients use to recover events the real-time layer
/// dropped while they were away.
async fn notification_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<NotificationRecord>>, AppError> {
    let records: Vec<NotificationRecord> = sqlx::query_as(
        r#"
        SELECT id, user_id, message, kind, created_at
        FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(&user_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(records))
}
