//! Deepgram Aura speech synthesis provider.
//!
//! One `POST /v1/speak` request per sentence; the whole encoded body is
//! returned as a single audio item, matching the sentence-at-a-time
//! contract of the TTS worker.

use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::base::{TextToSpeech, TtsError};

const DEEPGRAM_SPEAK_URL: &str = "https://api.deepgram.com/v1/speak";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Deepgram TTS provider using the REST (non-streaming) speak API.
pub struct DeepgramTts {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    encoding: String,
}

impl DeepgramTts {
    pub fn new(api_key: String, voice: String, encoding: String) -> Result<Self, TtsError> {
        if api_key.is_empty() {
            return Err(TtsError::ConfigurationError(
                "Deepgram API key is empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TtsError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            voice,
            encoding,
        })
    }

    fn build_url(&self) -> Result<Url, TtsError> {
        let mut url = Url::parse(DEEPGRAM_SPEAK_URL)
            .map_err(|e| TtsError::ConfigurationError(format!("Invalid base URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("model", &self.voice)
            .append_pair("encoding", &self.encoding);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl TextToSpeech for DeepgramTts {
    async fn synthesize(&self, text: &str) -> Result<Bytes, TtsError> {
        debug!("Synthesizing {} chars with voice {}", text.len(), self.voice);

        let response = self
            .client
            .post(self.build_url()?)
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| TtsError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Deepgram synthesis failed ({status}): {body}");
            return Err(TtsError::ProviderError {
                status: status.as_u16(),
                message: body,
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TtsError::RequestFailed(e.to_string()))?;
        debug!("Synthesized {} bytes of audio", audio.len());
        Ok(audio)
    }

    fn provider_name(&self) -> &'static str {
        "deepgram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_key() {
        let result = DeepgramTts::new(String::new(), "aura-asteria-en".into(), "mp3".into());
        assert!(matches!(result, Err(TtsError::ConfigurationError(_))));
    }

    #[test]
    fn test_speak_url_carries_voice_and_encoding() {
        let tts = DeepgramTts::new("key".into(), "aura-asteria-en".into(), "mp3".into()).unwrap();
        let url = tts.build_url().unwrap();
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(query.contains(&("model".to_string(), "aura-asteria-en".to_string())));
        assert!(query.contains(&("encoding".to_string(), "mp3".to_string())));
    }
}
