//! Per-message actions: copy, share, listen.

use std::sync::Arc;

use samsaya_llm::ModelClient;

use crate::capabilities::{AudioPlayer, Clipboard, Notifier, ShareError, ShareSink, SpeechDecoder};
use crate::logging::Timer;

pub const SHARE_TITLE: &str = "Gemini-Saṃśaya Research";
pub const COPIED_NOTICE: &str = "Copied to clipboard";

pub struct MessageActions {
    client: Arc<dyn ModelClient>,
    clipboard: Arc<dyn Clipboard>,
    share: Arc<dyn ShareSink>,
    decoder: Arc<dyn SpeechDecoder>,
    player: Arc<dyn AudioPlayer>,
    notifier: Arc<dyn Notifier>,
}

impl MessageActions {
    pub fn new(
        client: Arc<dyn ModelClient>,
        clipboard: Arc<dyn Clipboard>,
        share: Arc<dyn ShareSink>,
        decoder: Arc<dyn SpeechDecoder>,
        player: Arc<dyn AudioPlayer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            clipboard,
            share,
            decoder,
            player,
            notifier,
        }
    }

    pub fn copy(&self, text: &str) -> bool {
        match self.clipboard.set_text(text) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Copy failed: {}", e);
                false
            }
        }
    }

    /// Falls back to a clipboard copy when there is no native share target.
    pub async fn share(&self, text: &str) {
        match self.share.share(SHARE_TITLE, text).await {
            Ok(()) => {}
            Err(ShareError::Unavailable) => {
                if self.copy(text) {
                    self.notifier.alert(COPIED_NOTICE);
                }
            }
            Err(e) => log::info!("Share not completed: {}", e),
        }
    }

    /// Synthesize and play `text`. Failures are logged only.
    pub async fn listen(&self, text: &str) -> bool {
        let timer = Timer::new("speech synthesis");
        let bytes = match self.client.synthesize_speech(text).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("TTS Error: {}", e);
                return false;
            }
        };
        timer.debug("listen");

        let buffer = match self.decoder.decode(&bytes) {
            Ok(buffer) => buffer,
            Err(e) => {
                log::error!("Failed to decode speech: {}", e);
                return false;
            }
        };

        match self.player.play(&buffer) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Playback failed: {}", e);
                false
            }
        }
    }
}
