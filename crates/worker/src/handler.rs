//! Job dispatch and the notification handler.
//!
//! Dispatch is a typed table: a job name either parses into a [`JobKind`]
//! with a handler behind it, or the job fails loudly and goes back through
//! the queue's retry machinery. An unknown name is never a silent no-op.

use chrono::Utc;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use uuid::Uuid;

use courier_common::broadcast;
use courier_common::error::AppError;
use courier_common::payload;
use courier_queue::{Job, NOTIFICATION_JOB};

/// Job types this worker knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Notification,
}

impl JobKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            NOTIFICATION_JOB => Some(JobKind::Notification),
            _ => None,
        }
    }
}

/// Routes dequeued jobs to their handlers.
pub struct Dispatcher {
    pool: PgPool,
    redis: ConnectionManager,
}

impl Dispatcher {
    pub fn new(pool: PgPool, redis: ConnectionManager) -> Self {
        Self { pool, redis }
    }

    /// Handle one job. An `Err` here means the caller must nack so the
    /// queue's retry policy decides the job's fate.
    pub async fn dispatch(&mut self, job: &Job) -> Result<(), AppError> {
        match JobKind::parse(&job.name) {
            Some(JobKind::Notification) => self.handle_notification(job).await,
            None => {
                tracing::error!(job_id = %job.id, name = %job.name, "No handler registered for job");
                Err(AppError::Queue(format!(
                    "no handler registered for job '{}'",
                    job.name
                )))
            }
        }
    }

    /// The "notification" handler: re-validate, persist, publish.
    ///
    /// Persist failure aborts before any publish, so nothing is ever
    /// broadcast without a durable record behind it. A publish failure after
    /// a successful persist is logged and swallowed: the record is durable,
    /// the real-time path is best-effort.
    async fn handle_notification(&mut self, job: &Job) -> Result<(), AppError> {
        // Defense in depth: never trust that submission-time validation ran.
        let payload = payload::validated(&job.data)?;

        let record_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO notifications (id, user_id, message, kind, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record_id)
        .bind(&payload.user_id)
        .bind(&payload.message)
        .bind(&payload.kind)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::info!(
            job_id = %job.id,
            record_id = %record_id,
            user_id = %payload.user_id,
            kind = %payload.kind,
            "Notification record persisted"
        );

        if let Err(e) = broadcast::publish(&mut self.redis, &payload).await {
            tracing::warn!(
                job_id = %job.id,
                error = %e,
                "Broadcast publish failed after persist; record is durable, real-time delivery skipped"
            );
        }

        Ok(())
    }
}
