use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::GatewayState;
use crate::ws::ws_handler;

/// Build the gateway router: the WebSocket endpoint plus a health check.
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "courier-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.registry.connection_count()
    }))
}
