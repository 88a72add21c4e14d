//! Mural server binary.

use mural_server::{AppState, ServerConfig, app};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mural_server=info,mural_core=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let addr = config.bind_addr;
    let state = Arc::new(AppState::new(config));

    info!("Mural server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws?room=<name>", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
