//! Terminal implementations of the capability traits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use colored::Colorize;
use samsaya_llm::{decode_pcm16, PcmBuffer};

use crate::attachments::mime_for_path;
use crate::audio::RECORDING_PREFERENCE;
use crate::capabilities::{
    AudioPlayer, AudioRecorder, Clipboard, ClipboardError, DeviceError, Notifier, PlaybackError,
    ShareError, ShareSink, SpeechDecoder,
};

const CHUNK_SIZE: usize = 16 * 1024;

/// System clipboard through `arboard`.
pub struct ArboardClipboard;

impl Clipboard for ArboardClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

/// Terminals have no share sheet.
pub struct NoNativeShare;

#[async_trait]
impl ShareSink for NoNativeShare {
    async fn share(&self, _title: &str, _text: &str) -> Result<(), ShareError> {
        Err(ShareError::Unavailable)
    }
}

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        eprintln!("{} {}", "!".yellow().bold(), message.yellow());
    }
}

fn clip_mime(path: &Path) -> Option<&'static str> {
    let mime = mime_for_path(path);
    RECORDING_PREFERENCE.contains(&mime).then_some(mime)
}

/// Stands in for a microphone by replaying a recorded clip from disk.
#[derive(Default)]
pub struct FileRecorder {
    clip: Option<PathBuf>,
    buffered: Option<Vec<u8>>,
}

impl FileRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the clip the next recording reads from.
    pub fn set_clip(&mut self, path: impl Into<PathBuf>) {
        self.clip = Some(path.into());
    }
}

#[async_trait]
impl AudioRecorder for FileRecorder {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.clip
            .as_deref()
            .and_then(clip_mime)
            .map_or(false, |mime| mime == mime_type)
    }

    async fn start(&mut self, _mime_type: &str) -> Result<(), DeviceError> {
        let clip = self
            .clip
            .clone()
            .ok_or_else(|| DeviceError::Unavailable("no clip selected".to_string()))?;

        let bytes = tokio::fs::read(&clip).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                DeviceError::PermissionDenied(clip.display().to_string())
            }
            _ => DeviceError::Io(e),
        })?;

        log::debug!("Capturing {} bytes from {}", bytes.len(), clip.display());
        self.buffered = Some(bytes);
        Ok(())
    }

    async fn stop(&mut self) -> Result<Vec<Vec<u8>>, DeviceError> {
        let bytes = self.buffered.take().ok_or(DeviceError::NotRecording)?;
        Ok(bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect())
    }
}

/// Raw 16-bit PCM at 24 kHz mono.
pub struct Pcm16Decoder;

impl SpeechDecoder for Pcm16Decoder {
    fn decode(&self, bytes: &[u8]) -> Result<PcmBuffer, PlaybackError> {
        if bytes.is_empty() {
            return Err(PlaybackError::Empty);
        }
        Ok(decode_pcm16(bytes))
    }
}

/// Renders speech to a WAV file in `dir`.
pub struct WavFilePlayer {
    dir: PathBuf,
}

impl WavFilePlayer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write_to(&self, path: &Path, buffer: &PcmBuffer) -> Result<(), PlaybackError> {
        if buffer.is_empty() {
            return Err(PlaybackError::Empty);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, wav_bytes(buffer))?;
        Ok(())
    }
}

impl AudioPlayer for WavFilePlayer {
    fn play(&self, buffer: &PcmBuffer) -> Result<(), PlaybackError> {
        let name = format!("speech-{}.wav", chrono::Local::now().format("%Y%m%d-%H%M%S%.3f"));
        let path = self.dir.join(name);
        self.write_to(&path, buffer)?;
        println!("{} {}", "♪ saved".green(), path.display());
        Ok(())
    }
}

/// 16-bit PCM RIFF/WAVE encoding of `buffer`.
pub fn wav_bytes(buffer: &PcmBuffer) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let block_align = buffer.channels * bits_per_sample / 8;
    let byte_rate = buffer.sample_rate * u32::from(block_align);
    let data_len = (buffer.samples.len() * 2) as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&buffer.channels.to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in &buffer.samples {
        let value = (sample.clamp(-1.0, 1.0) * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_and_samples() {
        let buffer = decode_pcm16(&[0x00, 0x40, 0x00, 0xC0]);
        let bytes = wav_bytes(&buffer);

        assert_eq!(bytes.len(), 48);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]), 4);
        assert_eq!(&bytes[44..], &[0x00, 0x40, 0x00, 0xC0]);
    }

    #[test]
    fn decoder_rejects_empty_payload() {
        assert!(matches!(Pcm16Decoder.decode(&[]), Err(PlaybackError::Empty)));
    }

    #[test]
    fn player_writes_wav_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let player = WavFilePlayer::new(dir.path().join("out"));
        player.play(&decode_pcm16(&[0x00, 0x40])).unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path().join("out")).unwrap().collect();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn file_recorder_replays_clip_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("question.wav");
        std::fs::write(&clip, vec![7u8; CHUNK_SIZE + 10]).unwrap();

        let mut recorder = FileRecorder::new();
        recorder.set_clip(&clip);
        assert!(recorder.is_type_supported("audio/wav"));
        assert!(!recorder.is_type_supported("audio/webm"));

        recorder.start("audio/wav").await.unwrap();
        let chunks = recorder.stop().await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.concat().len(), CHUNK_SIZE + 10);
        assert!(matches!(recorder.stop().await, Err(DeviceError::NotRecording)));
    }

    #[tokio::test]
    async fn file_recorder_without_clip_is_unavailable() {
        let mut recorder = FileRecorder::new();
        assert!(matches!(
            recorder.start("audio/webm").await,
            Err(DeviceError::Unavailable(_))
        ));
    }
}
