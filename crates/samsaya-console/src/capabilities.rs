//! Platform side effects the console depends on.
//!
//! The controller and the conversation logic only see these traits. The terminal build
//! wires the implementations in [`crate::platform`]; tests substitute in-memory doubles.

use async_trait::async_trait;
use samsaya_llm::PcmBuffer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Not recording")]
    NotRecording,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ShareError {
    /// No native share target on this platform.
    #[error("Native sharing is not available")]
    Unavailable,

    #[error("Share cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Audio payload is empty")]
    Empty,

    #[error("Playback failed: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Microphone-style capture producing encoded chunks.
#[async_trait]
pub trait AudioRecorder: Send {
    /// Whether the device can encode into `mime_type`.
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Acquire the device and start buffering encoded chunks.
    async fn start(&mut self, mime_type: &str) -> Result<(), DeviceError>;

    /// Stop, release the device, and hand back the buffered chunks in order.
    async fn stop(&mut self) -> Result<Vec<Vec<u8>>, DeviceError>;
}

/// Turns synthesized speech bytes into a playable buffer.
pub trait SpeechDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer, PlaybackError>;
}

pub trait AudioPlayer: Send + Sync {
    fn play(&self, buffer: &PcmBuffer) -> Result<(), PlaybackError>;
}

pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[async_trait]
pub trait ShareSink: Send + Sync {
    async fn share(&self, title: &str, text: &str) -> Result<(), ShareError>;
}

/// Blocking user-facing alerts and confirmations.
pub trait Notifier: Send + Sync {
    fn alert(&self, message: &str);
}
