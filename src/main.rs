use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use anyhow::anyhow;

use voxa::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();

    // Create application state
    let app_state = AppState::new(config).await;

    // Combine API and WebSocket routes. CORS is permissive: the client
    // application is deployed separately from this API server.
    let app = Router::new()
        .merge(routes::api::create_api_router())
        .merge(routes::ws::create_ws_router())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = TcpListener::bind(&address).await?;
    println!("Server listening on {address}");

    axum::serve(listener, app).await?;

    Ok(())
}
