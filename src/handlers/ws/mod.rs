//! WebSocket session handling: upgrade, frame routing, and teardown.

pub mod handler;

pub use handler::ws_voice_handler;
