//! Courier worker binary entrypoint.

use tokio::task::JoinSet;

use courier_common::config::AppConfig;
use courier_common::db;
use courier_common::redis_pool::create_redis_pool;
use courier_queue::{JobConsumer, NOTIFICATION_JOB, QueueConfig};
use courier_worker::handler::Dispatcher;
use courier_worker::runner::run_consumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_worker=info,courier_queue=info".into()),
        )
        .json()
        .init();

    tracing::info!("Courier worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Create Redis connection
    let redis = create_redis_pool(&config.redis_url).await?;

    let queue_config = QueueConfig {
        max_attempts: config.queue_max_attempts,
        retry_base_ms: config.queue_retry_base_ms,
    };

    // One independent consumer loop per concurrency slot
    let mut consumers = JoinSet::new();
    for i in 0..config.worker_concurrency {
        let consumer_name = format!("{}-{}", config.worker_name, i);
        let consumer = JobConsumer::new(
            redis.clone(),
            NOTIFICATION_JOB,
            &consumer_name,
            queue_config.clone(),
        );
        let dispatcher = Dispatcher::new(pool.clone(), redis.clone());

        tracing::info!(consumer = %consumer_name, "Starting consumer loop");
        consumers.spawn(run_consumer(consumer, dispatcher));
    }

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        Some(result) = consumers.join_next() => {
            match result {
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Consumer loop exited with error");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Consumer task panicked");
                    return Err(e.into());
                }
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
            consumers.shutdown().await;
        }
    }

    tracing::info!("Courier worker stopped.");
    Ok(())
}
