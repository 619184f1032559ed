//! Text-to-speech providers.

pub mod base;
pub mod deepgram;

pub use base::{TextToSpeech, TtsError};
pub use deepgram::DeepgramTts;
