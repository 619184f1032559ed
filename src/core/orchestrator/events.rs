//! Client/server event frames for the session wire protocol.
//!
//! One UTF-8 JSON object per frame. Inbound frames are tagged by `type`,
//! outbound frames by `event`. Unknown tags fail to parse and are logged
//! and dropped by the router; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Frames the client sends to the orchestrator. The client runs VAD locally
/// and reports voice onset, the finished utterance blob, and its playback
/// lifecycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// VAD detected voice onset.
    SpeechStart,
    /// Complete utterance audio, base64 encoded.
    SpeechEnd {
        audio: String,
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// First audio chunk is now playing on the client.
    ClientPlaybackStarted,
    /// The client's audio queue has drained.
    ClientPlaybackComplete,
}

/// Frames the orchestrator sends to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        message: String,
        session_id: String,
    },
    /// Enqueue and play one audio chunk (base64).
    PlayAudio { audio: String },
    /// Pause playback but keep the local queue for a possible resume.
    StopPlayback {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Resume paused playback or process queued chunks.
    PlaybackResume,
    /// Discard all client-side audio, paused and queued.
    PlaybackReset,
    /// Informational: the last recognized user turn.
    Transcript { text: String },
    /// Informational: the agent's textual response.
    AgentResponse { text: String },
    /// Recoverable error notification.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_parsing() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"speech_start"}"#).unwrap();
        assert!(matches!(event, ClientEvent::SpeechStart));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"speech_end","audio":"AAAA","timestamp":12}"#).unwrap();
        match event {
            ClientEvent::SpeechEnd { audio, timestamp } => {
                assert_eq!(audio, "AAAA");
                assert_eq!(timestamp, Some(12));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_client_event_ignores_unknown_fields() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"client_playback_started","extra":true}"#).unwrap();
        assert!(matches!(event, ClientEvent::ClientPlaybackStarted));
    }

    #[test]
    fn test_unknown_client_event_fails_to_parse() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"type":"warp_drive"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_tagging() {
        let json = serde_json::to_value(ServerEvent::PlaybackResume).unwrap();
        assert_eq!(json["event"], "playback_resume");

        let json = serde_json::to_value(ServerEvent::StopPlayback { message: None }).unwrap();
        assert_eq!(json["event"], "stop_playback");
        assert!(json.get("message").is_none());

        let json = serde_json::to_value(ServerEvent::PlayAudio {
            audio: "QUJD".to_string(),
        })
        .unwrap();
        assert_eq!(json["audio"], "QUJD");
    }
}
