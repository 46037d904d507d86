//! Courier gateway binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courier_common::config::AppConfig;
use courier_gateway::registry::ConnectionRegistry;
use courier_gateway::routes::create_router;
use courier_gateway::state::GatewayState;
use courier_gateway::subscriber::run_subscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("courier_gateway=debug,tower_http=debug")),
        )
        .init();

    tracing::info!("Starting Courier gateway...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // The registry is constructed here, once, and handed to both the router
    // and the subscriber loop — no hidden globals.
    let registry = Arc::new(ConnectionRegistry::new());
    let state = GatewayState::new(registry.clone(), &config);

    // Shared subscriber loop for the broadcast channel
    let subscriber = tokio::spawn(run_subscriber(config.redis_url.clone(), registry));

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr: SocketAddr = config.gateway_bind.parse()?;
    tracing::info!("Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    subscriber.abort();
    tracing::info!("Courier gateway stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received shutdown signal, stopping gracefully...");
    }
}
