pub mod audio;
pub mod protocol;
pub mod provider;
pub mod providers;

pub use audio::{decode_pcm16, PcmBuffer, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
pub use provider::{LLMError, ModelClient, Result, TextStream};
pub use providers::gemini::{GeminiModels, GeminiProvider};
