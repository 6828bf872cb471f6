//! Decoding of synthesized speech.
//!
//! The speech endpoint answers with headerless little-endian 16-bit mono PCM at 24 kHz.
//! That format is fixed by the endpoint and voice configuration; this is not a general
//! purpose decoder and will misread audio in any other format.

pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
pub const SPEECH_CHANNELS: u16 = 1;

/// Playable mono buffer with samples in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl PcmBuffer {
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Interpret `bytes` as 16-bit mono PCM at 24 kHz. A trailing odd byte is dropped.
pub fn decode_pcm16(bytes: &[u8]) -> PcmBuffer {
    if bytes.len() % 2 != 0 {
        log::warn!(
            "PCM payload has odd length {}; dropping trailing byte",
            bytes.len()
        );
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    PcmBuffer {
        sample_rate: SPEECH_SAMPLE_RATE,
        channels: SPEECH_CHANNELS,
        samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_extremes() {
        let bytes = [
            0x00, 0x80, // i16::MIN
            0xFF, 0x7F, // i16::MAX
            0x00, 0x00, // zero
        ];
        let buffer = decode_pcm16(&bytes);

        assert_eq!(buffer.sample_rate, 24_000);
        assert_eq!(buffer.channels, 1);
        assert_eq!(buffer.samples.len(), 3);
        assert_eq!(buffer.samples[0], -1.0);
        assert!((buffer.samples[1] - 32767.0 / 32768.0).abs() < f32::EPSILON);
        assert_eq!(buffer.samples[2], 0.0);
        assert!(buffer.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn odd_trailing_byte_is_ignored() {
        let buffer = decode_pcm16(&[0x00, 0x40, 0x12]);
        assert_eq!(buffer.samples, vec![0.5]);
    }

    #[test]
    fn duration_follows_sample_rate() {
        let buffer = decode_pcm16(&vec![0u8; 48_000]);
        assert_eq!(buffer.frame_count(), 24_000);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
        assert!(decode_pcm16(&[]).is_empty());
    }
}
