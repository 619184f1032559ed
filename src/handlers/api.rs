use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub deepgram_configured: bool,
    pub groq_configured: bool,
    pub groq_model: Option<String>,
}

/// Service information response for the root endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub websocket_path: String,
}

/// Root endpoint with API information
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "Voxa Orchestrator API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        websocket_path: "/ws".to_string(),
    })
}

/// Health check handler for monitoring
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let groq_configured = state.config.groq_api_key.is_some();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "voxa-orchestrator".to_string(),
        deepgram_configured: state.config.deepgram_api_key.is_some(),
        groq_configured,
        groq_model: groq_configured.then(|| state.config.groq_model.clone()),
    })
}
