//! Shared application state for the gateway's Axum router.

use std::sync::Arc;
use std::time::Duration;

use courier_common::config::AppConfig;

use crate::registry::ConnectionRegistry;

/// State shared across WebSocket handlers via Axum `State`.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<ConnectionRegistry>,
    /// Per-connection outbound buffer size.
    pub send_buffer: usize,
    /// How long a fresh connection may sit unidentified.
    pub join_timeout: Duration,
}

impl GatewayState {
    pub fn new(registry: Arc<ConnectionRegistry>, config: &AppConfig) -> Self {
        Self {
            registry,
            send_buffer: config.gateway_send_buffer,
            join_timeout: Duration::from_secs(config.gateway_join_timeout_secs),
        }
    }
}
