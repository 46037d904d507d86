//! Durable Redis-backed work queue with at-least-once delivery.
//!
//! Every piece of queue state lives in Redis, never only in process memory,
//! so jobs survive both producer and consumer restarts. Delivery follows the
//! reliable-list pattern: a blocking `BLMOVE` shifts a job from the pending
//! list to a per-consumer processing list, where it stays until the consumer
//! acks (done) or nacks (retry with exponential backoff via a delayed zset,
//! or parked in the dead list once attempts are exhausted).
//!
//! Ordering is best-effort FIFO per queue; retries and concurrent consumers
//! may reorder.

pub mod job;
pub mod keys;
pub mod queue;

pub use job::Job;
pub use queue::{Delivery, JobConsumer, NackOutcome, QueueConfig, enqueue};

/// The single job type this pipeline registers.
pub const NOTIFICATION_JOB: &str = "notification";
