//! Core conversation pipeline: the per-session orchestrator, service
//! providers (STT, LLM, TTS), and the tool execution layer.

pub mod llm;
pub mod orchestrator;
pub mod stt;
pub mod tools;
pub mod tts;

pub use orchestrator::Orchestrator;
