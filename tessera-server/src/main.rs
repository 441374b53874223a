//! Tessera Server - REST API for U2F second-factor device management
//!
//! Exposes tessera-core functionality via HTTP endpoints:
//! - POST /devices/register/start - Issue a registration challenge
//! - POST /devices/register/finish - Bind the token's key material
//! - POST /devices/authenticate/start - Issue an authentication challenge
//! - POST /devices/authenticate/finish - Verify the token's assertion

use std::sync::Arc;

use tessera_core::MockCrypto;
use tessera_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    // No production U2F provider is wired in yet. The deterministic mock is
    // only acceptable when explicitly opted into.
    if !config.allow_mock_crypto {
        tracing::error!(
            "No U2F crypto provider configured. Set TESSERA_ALLOW_MOCK_CRYPTO=true to run \
             with the deterministic mock provider (NOT suitable for production)."
        );
        std::process::exit(1);
    }
    tracing::warn!("Using deterministic mock U2F provider (TESSERA_ALLOW_MOCK_CRYPTO=true)");
    let crypto = Arc::new(MockCrypto::default());

    let state = match AppState::from_env(&config, crypto).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application state: {e}");
            std::process::exit(1);
        }
    };

    let app = create_router_with_config(&config, state);

    let addr = config.socket_addr();
    tracing::info!("Tessera server listening on {addr}");
    tracing::info!("Swagger UI available at http://{addr}/docs");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}
