//! Speech-to-text providers.

pub mod base;
pub mod deepgram;

pub use base::{SpeechToText, SttError};
pub use deepgram::DeepgramStt;
