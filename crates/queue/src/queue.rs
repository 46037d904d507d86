//! Enqueue/dequeue operations and the retry state machine.

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Direction};
use uuid::Uuid;

use crate::job::Job;
use crate::keys;

/// Seconds a blocking pop waits before returning empty so the consumer loop
/// can run housekeeping (delayed-job promotion, shutdown checks).
const BLOCK_SECS: f64 = 5.0;

/// Delayed jobs promoted per housekeeping pass.
const PROMOTE_BATCH: isize = 100;

/// Upper bound on a single retry delay.
const MAX_BACKOFF_MS: u64 = 60_000;

/// Retry policy for a consumer.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Delivery attempts before a job is parked in the dead list.
    pub max_attempts: u32,
    /// Base delay for exponential backoff, in milliseconds.
    pub retry_base_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_base_ms: 1000,
        }
    }
}

/// A job handed to a consumer, plus the exact envelope bytes sitting in the
/// processing list. Ack/nack remove by value, so the raw string must survive
/// untouched.
#[derive(Debug)]
pub struct Delivery {
    pub job: Job,
    raw: String,
}

/// What a nack did with the job.
#[derive(Debug, PartialEq, Eq)]
pub enum NackOutcome {
    /// Scheduled for redelivery after `delay_ms`.
    Retried { attempts: u32, delay_ms: u64 },
    /// Attempts exhausted; parked in the dead list.
    Dead { attempts: u32 },
}

/// Enqueue a job onto `queue`, returning its id.
///
/// The job is durable the moment this returns: it sits in a Redis list, not
/// in process memory.
pub async fn enqueue<T: serde::Serialize>(
    redis: &mut ConnectionManager,
    queue: &str,
    data: &T,
) -> anyhow::Result<Uuid> {
    let job = Job::new(queue, serde_json::to_value(data)?);
    let raw = serde_json::to_string(&job)?;

    redis.lpush::<_, _, ()>(keys::pending(queue), &raw).await?;

    tracing::info!(job_id = %job.id, queue, "Job enqueued");
    Ok(job.id)
}

/// One consumer loop's view of a queue.
///
/// `consumer` names this loop's processing list. Reusing the same name
/// across restarts (e.g. `worker-0` on the same host) lets [`recover`]
/// reclaim jobs the previous incarnation died holding.
///
/// [`recover`]: JobConsumer::recover
pub struct JobConsumer {
    redis: ConnectionManager,
    queue: String,
    consumer: String,
    config: QueueConfig,
}

impl JobConsumer {
    pub fn new(redis: ConnectionManager, queue: &str, consumer: &str, config: QueueConfig) -> Self {
        Self {
            redis,
            queue: queue.to_string(),
            consumer: consumer.to_string(),
            config,
        }
    }

    /// Drain this consumer's processing list back to pending.
    ///
    /// Call once at startup. Jobs found here were mid-flight when the
    /// previous process died; re-queueing them is what makes delivery
    /// at-least-once rather than at-most-once.
    pub async fn recover(&mut self) -> anyhow::Result<u64> {
        let processing = keys::processing(&self.queue, &self.consumer);
        let pending = keys::pending(&self.queue);

        let mut recovered = 0u64;
        loop {
            let moved: Option<String> = self
                .redis
                .lmove(&processing, &pending, Direction::Left, Direction::Right)
                .await?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            tracing::warn!(
                queue = %self.queue,
                consumer = %self.consumer,
                recovered,
                "Re-queued jobs left in processing by a previous run"
            );
        }
        Ok(recovered)
    }

    /// Block until a job is available, or return `None` after the block
    /// window elapses with the queue empty.
    ///
    /// Promotes due delayed jobs before blocking, so retries become visible
    /// without a dedicated promoter process.
    pub async fn next_job(&mut self) -> anyhow::Result<Option<Delivery>> {
        self.promote_due().await?;

        let raw: Option<String> = self
            .redis
            .blmove(
                keys::pending(&self.queue),
                keys::processing(&self.queue, &self.consumer),
                Direction::Right,
                Direction::Left,
                BLOCK_SECS,
            )
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<Job>(&raw) {
            Ok(job) => Ok(Some(Delivery { job, raw })),
            Err(e) => {
                // An envelope we cannot even parse goes straight to the dead
                // list; retrying cannot fix it. Dead-list write first, then
                // the processing removal: a crash between the two leaves a
                // copy in both places, never in neither.
                tracing::error!(queue = %self.queue, error = %e, "Unparseable job envelope, parking in dead list");
                self.redis
                    .lpush::<_, _, ()>(keys::dead(&self.queue), &raw)
                    .await?;
                self.redis
                    .lrem::<_, _, ()>(keys::processing(&self.queue, &self.consumer), 1, &raw)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Acknowledge a finished job, removing it from the processing list.
    pub async fn ack(&mut self, delivery: &Delivery) -> anyhow::Result<()> {
        let removed: i64 = self
            .redis
            .lrem(
                keys::processing(&self.queue, &self.consumer),
                1,
                &delivery.raw,
            )
            .await?;

        if removed == 0 {
            // Someone else (a recovery pass) already claimed it; the job may
            // run twice, which at-least-once permits.
            tracing::warn!(job_id = %delivery.job.id, "Acked job was no longer in processing list");
        }
        Ok(())
    }

    /// Report a failed job. Increments `attempts`, then either schedules a
    /// delayed retry or parks the job in the dead list with its payload
    /// logged, so an exhausted job is inspectable rather than gone.
    ///
    /// The destination (delayed zset or dead list) is written before the
    /// processing copy is removed. A crash between the two commands leaves
    /// the job in both structures — a duplicate delivery on recovery, which
    /// at-least-once permits — never in neither.
    pub async fn nack(&mut self, delivery: Delivery, reason: &str) -> anyhow::Result<NackOutcome> {
        let Delivery { mut job, raw } = delivery;
        job.attempts += 1;
        let requeued = serde_json::to_string(&job)?;

        let outcome = if job.attempts >= self.config.max_attempts {
            self.redis
                .lpush::<_, _, ()>(keys::dead(&self.queue), &requeued)
                .await?;
            tracing::error!(
                job_id = %job.id,
                queue = %self.queue,
                attempts = job.attempts,
                payload = %job.data,
                reason,
                "Job exhausted retries, parked in dead list"
            );
            NackOutcome::Dead {
                attempts: job.attempts,
            }
        } else {
            let delay_ms = retry_backoff_ms(&self.config, job.attempts);
            let due = Utc::now().timestamp_millis() as f64 + delay_ms as f64;
            self.redis
                .zadd::<_, _, _, ()>(keys::delayed(&self.queue), &requeued, due)
                .await?;

            tracing::warn!(
                job_id = %job.id,
                queue = %self.queue,
                attempts = job.attempts,
                delay_ms,
                reason,
                "Job failed, retry scheduled"
            );
            NackOutcome::Retried {
                attempts: job.attempts,
                delay_ms,
            }
        };

        self.redis
            .lrem::<_, _, ()>(keys::processing(&self.queue, &self.consumer), 1, &raw)
            .await?;
        Ok(outcome)
    }

    /// Move due members of the delayed zset back onto the pending list.
    ///
    /// Each job is pushed to pending first; the ZREM that follows decides
    /// ownership. A promoter that loses the ZREM race withdraws the copy it
    /// pushed, so concurrent promoters net one copy. A crash anywhere in
    /// between leaves an extra pending copy, never zero.
    pub async fn promote_due(&mut self) -> anyhow::Result<u64> {
        let now = Utc::now().timestamp_millis() as f64;
        let due: Vec<String> = self
            .redis
            .zrangebyscore_limit(keys::delayed(&self.queue), f64::MIN, now, 0, PROMOTE_BATCH)
            .await?;

        let mut promoted = 0u64;
        for raw in due {
            self.redis
                .lpush::<_, _, ()>(keys::pending(&self.queue), &raw)
                .await?;
            let removed: i64 = self.redis.zrem(keys::delayed(&self.queue), &raw).await?;
            if removed == 1 {
                promoted += 1;
            } else {
                // Another promoter owned this job and pushed its own copy;
                // withdraw ours.
                self.redis
                    .lrem::<_, _, ()>(keys::pending(&self.queue), 1, &raw)
                    .await?;
            }
        }

        if promoted > 0 {
            tracing::debug!(queue = %self.queue, promoted, "Promoted delayed jobs");
        }
        Ok(promoted)
    }
}

/// Exponential backoff: `base * 2^(attempts-1)`, capped at one minute.
fn retry_backoff_ms(config: &QueueConfig, attempts: u32) -> u64 {
    let shift = attempts.saturating_sub(1).min(16);
    config
        .retry_base_ms
        .saturating_mul(1u64 << shift)
        .min(MAX_BACKOFF_MS)
}
