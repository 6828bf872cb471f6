//! LLM Providers

pub(crate) mod common;
pub mod gemini;

pub use gemini::GeminiProvider;
