use redis::Client;
use redis::aio::ConnectionManager;

/// Create a Redis connection manager for async queue and publish operations.
///
/// Pub/sub subscribers cannot use a `ConnectionManager`; they open a
/// dedicated connection via [`redis::Client::get_async_pubsub`] instead.
pub async fn create_redis_pool(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;

    tracing::info!("Connected to Redis");
    Ok(manager)
}
