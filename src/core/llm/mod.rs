//! Streaming language model providers with tool calling.

pub mod base;
pub mod groq;

pub use base::{ChatTurn, LanguageModel, LlmError, Role, TokenStream};
pub use groq::GroqLlm;
