use async_trait::async_trait;
use futures::Stream;
use samsaya_core::{Attachment, ChatOptions, Message};
use std::pin::Pin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API key not found")]
    MissingApiKey,

    #[error("No audio generated")]
    NoAudio,

    #[error("Audio payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Protocol conversion error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// Cumulative text snapshots of one model turn. Each item holds the full text
/// received so far, never a delta.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Stream the model's answer to a new turn.
    ///
    /// # Arguments
    /// * `history` - Prior messages, oldest first, not including the new turn
    /// * `new_text` - Text of the new user turn
    /// * `attachments` - Inline payloads sent with the new turn
    /// * `options` - Reasoning and grounding toggles
    async fn stream_turn(
        &self,
        history: &[Message],
        new_text: &str,
        attachments: &[Attachment],
        options: ChatOptions,
    ) -> Result<TextStream>;

    /// Transcribe recorded audio. Returns an empty string when the backend yields no text.
    async fn transcribe(&self, audio_base64: &str, mime_type: &str) -> Result<String>;

    /// Synthesize speech for `text`, returning the raw audio bytes.
    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>>;
}
