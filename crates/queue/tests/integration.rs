//! Integration tests for the durable queue.
//!
//! Requires a running Redis with `REDIS_URL` env var set (defaults to
//! `redis://localhost:6379`). Run with:
//!
//! ```bash
//! REDIS_URL="redis://localhost:6379" \
//!   cargo test -p courier-queue --test integration -- --ignored --nocapture
//! ```

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use courier_common::types::NotificationPayload;
use courier_queue::{Delivery, Job, JobConsumer, NackOutcome, QueueConfig, enqueue, keys};

// ============================================================
// Shared helpers
// ============================================================

async fn redis_conn() -> ConnectionManager {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let client = redis::Client::open(url).unwrap();
    ConnectionManager::new(client).await.unwrap()
}

/// Unique queue name per test so runs never interfere.
fn test_queue() -> String {
    format!("test-{}", Uuid::new_v4())
}

fn payload(user: &str) -> NotificationPayload {
    NotificationPayload {
        user_id: user.to_string(),
        message: "Order shipped".to_string(),
        kind: "system".to_string(),
    }
}

fn fast_config() -> QueueConfig {
    QueueConfig {
        max_attempts: 3,
        retry_base_ms: 10,
    }
}

async fn llen(redis: &mut ConnectionManager, key: &str) -> i64 {
    redis.llen(key).await.unwrap()
}

/// Pull the next job, failing the test if the queue stays empty.
async fn must_next(consumer: &mut JobConsumer) -> Delivery {
    consumer
        .next_job()
        .await
        .unwrap()
        .expect("queue should have a job")
}

// ============================================================
// Tests
// ============================================================

#[tokio::test]
#[ignore]
async fn test_enqueue_consume_ack() {
    let mut redis = redis_conn().await;
    let queue = test_queue();

    let job_id = enqueue(&mut redis, &queue, &payload("u1")).await.unwrap();
    assert_eq!(llen(&mut redis, &keys::pending(&queue)).await, 1);

    let mut consumer = JobConsumer::new(redis.clone(), &queue, "worker-0", fast_config());
    let delivery = must_next(&mut consumer).await;
    assert_eq!(delivery.job.id, job_id);
    assert_eq!(delivery.job.name, queue);
    assert_eq!(delivery.job.attempts, 0);
    assert_eq!(delivery.job.data["userId"], "u1");

    // In processing while unacked, gone after ack
    assert_eq!(llen(&mut redis, &keys::pending(&queue)).await, 0);
    assert_eq!(
        llen(&mut redis, &keys::processing(&queue, "worker-0")).await,
        1
    );
    consumer.ack(&delivery).await.unwrap();
    assert_eq!(
        llen(&mut redis, &keys::processing(&queue, "worker-0")).await,
        0
    );
}

#[tokio::test]
#[ignore]
async fn test_nack_schedules_retry_with_incremented_attempts() {
    let mut redis = redis_conn().await;
    let queue = test_queue();

    enqueue(&mut redis, &queue, &payload("u1")).await.unwrap();

    let mut consumer = JobConsumer::new(redis.clone(), &queue, "worker-0", fast_config());
    let delivery = must_next(&mut consumer).await;
    let outcome = consumer.nack(delivery, "induced failure").await.unwrap();
    assert_eq!(
        outcome,
        NackOutcome::Retried {
            attempts: 1,
            delay_ms: 10
        }
    );

    // Not yet pending, waiting in the delayed zset
    assert_eq!(llen(&mut redis, &keys::pending(&queue)).await, 0);

    // After the backoff elapses the next poll promotes and redelivers
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let redelivered = must_next(&mut consumer).await;
    assert_eq!(redelivered.job.attempts, 1);
    consumer.ack(&redelivered).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_exhausted_job_lands_in_dead_list() {
    let mut redis = redis_conn().await;
    let queue = test_queue();

    enqueue(&mut redis, &queue, &payload("u1")).await.unwrap();

    let mut consumer = JobConsumer::new(redis.clone(), &queue, "worker-0", fast_config());
    let mut last = NackOutcome::Retried {
        attempts: 0,
        delay_ms: 0,
    };
    for _ in 0..3 {
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        let delivery = must_next(&mut consumer).await;
        last = consumer.nack(delivery, "induced failure").await.unwrap();
    }
    assert_eq!(last, NackOutcome::Dead { attempts: 3 });

    // Parked, not dropped: the envelope is inspectable in the dead list
    assert_eq!(llen(&mut redis, &keys::dead(&queue)).await, 1);
    assert_eq!(llen(&mut redis, &keys::pending(&queue)).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_recover_requeues_processing_jobs() {
    let mut redis = redis_conn().await;
    let queue = test_queue();

    enqueue(&mut redis, &queue, &payload("u1")).await.unwrap();

    // First incarnation takes the job and "crashes" (never acks)
    let mut first = JobConsumer::new(redis.clone(), &queue, "worker-0", fast_config());
    let _held = must_next(&mut first).await;
    drop(first);
    assert_eq!(
        llen(&mut redis, &keys::processing(&queue, "worker-0")).await,
        1
    );

    // Restart under the same consumer name reclaims it
    let mut second = JobConsumer::new(redis.clone(), &queue, "worker-0", fast_config());
    assert_eq!(second.recover().await.unwrap(), 1);
    let redelivered = must_next(&mut second).await;
    assert_eq!(redelivered.job.data["userId"], "u1");
    second.ack(&redelivered).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_interrupted_nack_duplicates_instead_of_losing() {
    let mut redis = redis_conn().await;
    let queue = test_queue();

    // Reconstruct the state a crash mid-nack leaves behind: the retry
    // envelope already written to the delayed zset, the original still
    // sitting in processing because the LREM never ran.
    let job = Job::new(&queue, serde_json::to_value(payload("u1")).unwrap());
    let original = serde_json::to_string(&job).unwrap();
    let mut retried = job.clone();
    retried.attempts = 1;
    let requeued = serde_json::to_string(&retried).unwrap();

    redis
        .lpush::<_, _, ()>(keys::processing(&queue, "worker-0"), &original)
        .await
        .unwrap();
    redis
        .zadd::<_, _, _, ()>(keys::delayed(&queue), &requeued, 0.0)
        .await
        .unwrap();

    // Restart: recovery re-queues the processing copy, promotion re-queues
    // the delayed one. Both must surface — a duplicate, never a loss.
    let mut consumer = JobConsumer::new(redis.clone(), &queue, "worker-0", fast_config());
    consumer.recover().await.unwrap();

    let first = must_next(&mut consumer).await;
    consumer.ack(&first).await.unwrap();
    let second = must_next(&mut consumer).await;
    consumer.ack(&second).await.unwrap();

    assert_eq!(first.job.id, job.id);
    assert_eq!(second.job.id, job.id);
    assert_eq!(llen(&mut redis, &keys::pending(&queue)).await, 0);
    assert_eq!(
        llen(&mut redis, &keys::processing(&queue, "worker-0")).await,
        0
    );
}

#[tokio::test]
#[ignore]
async fn test_unparseable_envelope_is_parked_not_dropped() {
    let mut redis = redis_conn().await;
    let queue = test_queue();

    redis
        .lpush::<_, _, ()>(keys::pending(&queue), "not a job envelope")
        .await
        .unwrap();

    let mut consumer = JobConsumer::new(redis.clone(), &queue, "worker-0", fast_config());
    assert!(consumer.next_job().await.unwrap().is_none());

    // Garbage lands in the dead list, inspectable, and leaves processing
    assert_eq!(llen(&mut redis, &keys::dead(&queue)).await, 1);
    assert_eq!(
        llen(&mut redis, &keys::processing(&queue, "worker-0")).await,
        0
    );
}

#[tokio::test]
#[ignore]
async fn test_two_consumers_split_the_queue() {
    let mut redis = redis_conn().await;
    let queue = test_queue();

    for i in 0..4 {
        enqueue(&mut redis, &queue, &payload(&format!("u{i}")))
            .await
            .unwrap();
    }

    let mut a = JobConsumer::new(redis.clone(), &queue, "worker-a", fast_config());
    let mut b = JobConsumer::new(redis.clone(), &queue, "worker-b", fast_config());

    let mut seen = Vec::new();
    for _ in 0..2 {
        let d = must_next(&mut a).await;
        seen.push(d.job.id);
        a.ack(&d).await.unwrap();
        let d = must_next(&mut b).await;
        seen.push(d.job.id);
        b.ack(&d).await.unwrap();
    }

    // Every job delivered exactly once across both consumers
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 4);
    assert_eq!(llen(&mut redis, &keys::pending(&queue)).await, 0);
}
