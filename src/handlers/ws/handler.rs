//! Axum WebSocket handler and the per-connection event router.
//!
//! Each accepted socket gets its own orchestrator with isolated state.
//! Inbound JSON frames are parsed into [`ClientEvent`]s and dispatched;
//! frames that do not parse are logged and dropped, never fatal. Outbound
//! [`ServerEvent`]s flow through an mpsc channel drained by a dedicated
//! sender task.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::Orchestrator;
use crate::core::orchestrator::{ClientEvent, ServerEvent};
use crate::core::tools::ToolRegistry;
use crate::state::AppState;

/// Outbound channel depth. Deep enough that a turn's audio never stalls the
/// orchestrator on a briefly slow client.
const OUTBOUND_BUFFER_SIZE: usize = 256;

/// WebSocket voice session handler
/// Upgrades the HTTP connection to WebSocket for full-duplex conversation
pub async fn ws_voice_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("WebSocket voice connection upgrade requested");
    ws.on_upgrade(move |socket| handle_voice_socket(socket, state))
}

/// Manage one WebSocket session from accept to teardown.
async fn handle_voice_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let registry = Arc::new(ToolRegistry::new());
    let (stt, llm, tts) = match app_state.build_session_providers(registry.clone()) {
        Ok(providers) => providers,
        Err(message) => {
            warn!("Rejecting voice connection: {message}");
            let frame = ServerEvent::Error { message };
            if let Ok(json) = serde_json::to_string(&frame) {
                let _ = sender.send(Message::Text(json.into())).await;
            }
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER_SIZE);
    let orchestrator = Orchestrator::new(
        app_state.config.orchestrator.clone(),
        stt,
        llm,
        tts,
        registry,
        outbound_tx,
    );
    orchestrator.start();

    // Dedicated sender task: serialize and ship outbound frames in order.
    let sender_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize outbound frame: {e}"),
            }
        }
    });

    info!("[{}] Client connected", orchestrator.session_id());
    orchestrator
        .emit(ServerEvent::Connected {
            message: format!(
                "Connected to Voxa orchestrator (session {})",
                orchestrator.session_id()
            ),
            session_id: orchestrator.session_id().to_string(),
        })
        .await;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => orchestrator.handle_client_event(event).await,
                Err(e) => {
                    warn!(
                        "[{}] Ignoring unrecognized frame: {e}",
                        orchestrator.session_id()
                    );
                }
            },
            Ok(Message::Binary(data)) => {
                debug!(
                    "[{}] Ignoring {}-byte binary frame; protocol is JSON",
                    orchestrator.session_id(),
                    data.len()
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("[{}] Connection closed by client", orchestrator.session_id());
                break;
            }
            Err(e) => {
                warn!("[{}] WebSocket error: {e}", orchestrator.session_id());
                break;
            }
        }
    }

    orchestrator.shutdown().await;
    sender_task.abort();
    info!("[{}] Session terminated", orchestrator.session_id());
}
