use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (durable queue + pub/sub fanout)
    pub redis_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Maximum delivery attempts before a job is parked in the dead list (default: 5)
    pub queue_max_attempts: u32,

    /// Base delay for exponential retry backoff, in milliseconds (default: 1000)
    pub queue_retry_base_ms: u64,

    /// Number of concurrent consumer loops per worker process (default: 4)
    pub worker_concurrency: usize,

    /// Stable name for this worker process (default: "worker"). Consumer
    /// processing lists are keyed by it, so keeping the name across restarts
    /// lets a worker reclaim jobs its previous incarnation died holding.
    pub worker_name: String,

    /// Bind address for the gateway process (default: 0.0.0.0:4000)
    pub gateway_bind: String,

    /// Bind address for the submission API (default: 0.0.0.0:3000)
    pub api_bind: String,

    /// Per-connection outbound buffer size; a client that falls this many
    /// events behind is treated as dead (default: 64)
    pub gateway_send_buffer: usize,

    /// Seconds a fresh connection may sit unidentified before the gateway
    /// closes it (default: 10)
    pub gateway_join_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            queue_max_attempts: std::env::var("QUEUE_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("QUEUE_MAX_ATTEMPTS must be a valid u32"))?,
            queue_retry_base_ms: std::env::var("QUEUE_RETRY_BASE_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("QUEUE_RETRY_BASE_MS must be a valid u64"))?,
            worker_concurrency: std::env::var("WORKER_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("WORKER_CONCURRENCY must be a valid usize"))?,
            worker_name: std::env::var("WORKER_NAME").unwrap_or_else(|_| "worker".to_string()),
            gateway_bind: std::env::var("GATEWAY_BIND")
                .unwrap_or_else(|_| "0.0.0.0:4000".to_string()),
            api_bind: std::env::var("API_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            gateway_send_buffer: std::env::var("GATEWAY_SEND_BUFFER")
                .unwrap_or_else(|_| "64".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GATEWAY_SEND_BUFFER must be a valid usize"))?,
            gateway_join_timeout_secs: std::env::var("GATEWAY_JOIN_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GATEWAY_JOIN_TIMEOUT_SECS must be a valid u64"))?,
        })
    }
}
