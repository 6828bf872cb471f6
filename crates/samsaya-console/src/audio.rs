//! Speech-to-text capture: `Idle -> Recording -> Transcribing -> Idle`.

use base64::{engine::general_purpose, Engine as _};
use samsaya_llm::ModelClient;

use crate::capabilities::{AudioRecorder, Notifier};
use crate::logging::Timer;

/// Encodings tried in order when recording starts.
pub const RECORDING_PREFERENCE: [&str; 3] = ["audio/webm", "audio/mp4", "audio/wav"];
const FALLBACK_MIME: &str = "audio/webm";

pub const PERMISSION_ALERT: &str = "Microphone permission required for speech-to-text.";
pub const TRANSCRIPTION_ALERT: &str = "Could not transcribe audio. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Transcribing,
}

pub struct AudioCapture<R: AudioRecorder> {
    recorder: R,
    state: CaptureState,
    mime_type: String,
}

/// Append transcribed text to the draft, separated by one space.
pub fn append_to_draft(draft: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !draft.is_empty() {
        draft.push(' ');
    }
    draft.push_str(text);
}

impl<R: AudioRecorder> AudioCapture<R> {
    pub fn new(recorder: R) -> Self {
        Self {
            recorder,
            state: CaptureState::Idle,
            mime_type: FALLBACK_MIME.to_string(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Encoding of the current or last recording.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn recorder_mut(&mut self) -> &mut R {
        &mut self.recorder
    }

    fn select_mime_type(&self) -> &'static str {
        RECORDING_PREFERENCE
            .iter()
            .copied()
            .find(|mime| self.recorder.is_type_supported(mime))
            .unwrap_or(FALLBACK_MIME)
    }

    /// Acquire the device and begin recording. Returns whether recording started.
    pub async fn start_recording(&mut self, notifier: &dyn Notifier) -> bool {
        if self.state != CaptureState::Idle {
            log::debug!("Recording already in progress ({:?})", self.state);
            return false;
        }

        let mime_type = self.select_mime_type();
        match self.recorder.start(mime_type).await {
            Ok(()) => {
                log::info!("Recording started ({})", mime_type);
                self.mime_type = mime_type.to_string();
                self.state = CaptureState::Recording;
                true
            }
            Err(err) => {
                log::error!("Mic permission denied: {}", err);
                notifier.alert(PERMISSION_ALERT);
                false
            }
        }
    }

    /// Stop recording, transcribe, and append the text to `draft`.
    ///
    /// Returns the transcribed text, or `None` when nothing was recorded or the
    /// transcription failed (the user has been alerted in that case).
    pub async fn stop_recording(
        &mut self,
        client: &dyn ModelClient,
        draft: &mut String,
        notifier: &dyn Notifier,
    ) -> Option<String> {
        if self.state != CaptureState::Recording {
            return None;
        }

        let chunks = match self.recorder.stop().await {
            Ok(chunks) => chunks,
            Err(err) => {
                log::error!("Failed to finalize recording: {}", err);
                self.state = CaptureState::Idle;
                notifier.alert(TRANSCRIPTION_ALERT);
                return None;
            }
        };

        let payload: Vec<u8> = chunks.concat();
        let audio_base64 = general_purpose::STANDARD.encode(&payload);

        self.state = CaptureState::Transcribing;
        let timer = Timer::new("transcription");
        let result = client.transcribe(&audio_base64, &self.mime_type).await;
        timer.debug(&self.mime_type);
        self.state = CaptureState::Idle;

        match result {
            Ok(text) => {
                append_to_draft(draft, &text);
                Some(text)
            }
            Err(err) => {
                log::error!("Transcription failed: {}", err);
                notifier.alert(TRANSCRIPTION_ALERT);
                None
            }
        }
    }
}
