//! Deepgram pre-recorded transcription provider.
//!
//! Posts the complete utterance blob to `POST /v1/listen` and extracts the
//! first alternative's transcript. The audio container is detected from
//! magic bytes so browser recordings (WebM) and raw WAV captures both work
//! without the client declaring a format.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::base::{SpeechToText, SttError};

const DEEPGRAM_LISTEN_URL: &str = "https://api.deepgram.com/v1/listen";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Deepgram STT provider using the pre-recorded (non-streaming) API.
pub struct DeepgramStt {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
}

impl DeepgramStt {
    pub fn new(api_key: String, model: String, language: String) -> Result<Self, SttError> {
        if api_key.is_empty() {
            return Err(SttError::ConfigurationError(
                "Deepgram API key is empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SttError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model,
            language,
        })
    }

    /// Detect the audio container from magic bytes. Defaults to WebM, which
    /// is what browser MediaRecorder captures produce.
    fn detect_content_type(audio: &[u8]) -> &'static str {
        if audio.len() < 4 {
            return "audio/webm";
        }
        match &audio[..4] {
            // EBML header
            [0x1a, 0x45, 0xdf, 0xa3] => "audio/webm",
            b"RIFF" => "audio/wav",
            b"OggS" => "audio/ogg",
            [b'I', b'D', b'3', _] => "audio/mpeg",
            [0xff, b, _, _] if b & 0xe0 == 0xe0 => "audio/mpeg",
            _ => "audio/webm",
        }
    }

    fn build_url(&self) -> Result<Url, SttError> {
        let mut url = Url::parse(DEEPGRAM_LISTEN_URL)
            .map_err(|e| SttError::ConfigurationError(format!("Invalid base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("model", &self.model)
            .append_pair("language", &self.language)
            .append_pair("smart_format", "true");
        Ok(url)
    }
}

#[async_trait::async_trait]
impl SpeechToText for DeepgramStt {
    async fn transcribe(&self, audio: &[u8]) -> Result<Option<String>, SttError> {
        let content_type = Self::detect_content_type(audio);
        debug!(
            "Transcribing {} bytes ({content_type}) with model {}",
            audio.len(),
            self.model
        );

        let response = self
            .client
            .post(self.build_url()?)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .header(CONTENT_TYPE, content_type)
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| SttError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Deepgram transcription failed ({status}): {body}");
            return Err(SttError::ProviderError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SttError::InvalidResponse(e.to_string()))?;

        let transcript = body["results"]["channels"][0]["alternatives"][0]["transcript"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();

        if transcript.is_empty() {
            debug!("No speech detected in audio");
            Ok(None)
        } else {
            debug!("Transcript: '{transcript}'");
            Ok(Some(transcript))
        }
    }

    fn provider_name(&self) -> &'static str {
        "deepgram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            DeepgramStt::detect_content_type(&[0x1a, 0x45, 0xdf, 0xa3, 0x00]),
            "audio/webm"
        );
        assert_eq!(
            DeepgramStt::detect_content_type(b"RIFF....WAVEfmt "),
            "audio/wav"
        );
        assert_eq!(
            DeepgramStt::detect_content_type(b"OggS\x00\x02"),
            "audio/ogg"
        );
        assert_eq!(
            DeepgramStt::detect_content_type(&[0xff, 0xfb, 0x90, 0x00]),
            "audio/mpeg"
        );
        assert_eq!(DeepgramStt::detect_content_type(b"ID3\x04rest"), "audio/mpeg");
        // Unknown and short payloads fall back to WebM.
        assert_eq!(DeepgramStt::detect_content_type(b"zz"), "audio/webm");
        assert_eq!(DeepgramStt::detect_content_type(b"????"), "audio/webm");
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let result = DeepgramStt::new(String::new(), "nova-2".into(), "en".into());
        assert!(matches!(result, Err(SttError::ConfigurationError(_))));
    }

    #[test]
    fn test_listen_url_carries_model_and_language() {
        let stt = DeepgramStt::new("key".into(), "nova-2".into(), "en".into()).unwrap();
        let url = stt.build_url().unwrap();
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(query.contains(&("model".to_string(), "nova-2".to_string())));
        assert!(query.contains(&("language".to_string(), "en".to_string())));
    }
}
