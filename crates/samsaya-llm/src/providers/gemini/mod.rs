//! Google Gemini provider implementation.

mod stream;

pub use stream::{parse_gemini_sse_event, GeminiStreamState};

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, Response};
use samsaya_core::{persona_instruction, Attachment, ChatOptions, Message};

use crate::protocol::gemini::{
    turn_content, GeminiContent, GeminiPart, GeminiRequest, GeminiResponse, GeminiTool,
    GenerationConfig, SpeechConfig, ThinkingConfig,
};
use crate::protocol::{ProtocolResult, ToProvider};
use crate::provider::{LLMError, ModelClient, Result, TextStream};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const THINKING_MODEL: &str = "gemini-3-pro-preview";
pub const SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const SPEECH_VOICE: &str = "Kore";

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const THINKING_TEMPERATURE: f64 = 0.7;
pub const THINKING_BUDGET: u32 = 32768;

const TRANSCRIBE_INSTRUCTION: &str = "Transcribe the spoken audio exactly. Return only the text.";

/// Model names used for each kind of call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiModels {
    pub default: String,
    pub thinking: String,
    pub transcription: String,
    pub speech: String,
    pub voice: String,
}

impl Default for GeminiModels {
    fn default() -> Self {
        Self {
            default: DEFAULT_MODEL.to_string(),
            thinking: THINKING_MODEL.to_string(),
            transcription: DEFAULT_MODEL.to_string(),
            speech: SPEECH_MODEL.to_string(),
            voice: SPEECH_VOICE.to_string(),
        }
    }
}

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    models: GeminiModels,
}

impl GeminiProvider {
    /// Create a new Gemini provider with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_optional_key(Some(api_key.into()))
    }

    /// Create a provider from a key that may be absent. Without a key every call
    /// fails with [`LLMError::MissingApiKey`].
    pub fn from_optional_key(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: GeminiModels::default(),
        }
    }

    /// Set a custom base URL (e.g., for proxies or alternative endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_models(mut self, models: GeminiModels) -> Self {
        self.models = models;
        self
    }

    /// Use a preconfigured HTTP client (proxies, timeouts).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn models(&self) -> &GeminiModels {
        &self.models
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or(LLMError::MissingApiKey)
    }

    /// Model selected for a chat turn.
    pub fn select_model(&self, options: ChatOptions) -> &str {
        if options.thinking {
            &self.models.thinking
        } else {
            &self.models.default
        }
    }

    /// Build the streaming request for a new turn: prior history, then the new user
    /// turn, with the persona instruction and option-dependent generation settings.
    pub fn build_turn_request(
        &self,
        history: &[Message],
        new_text: &str,
        attachments: &[Attachment],
        options: ChatOptions,
    ) -> ProtocolResult<GeminiRequest> {
        let mut contents: Vec<GeminiContent> = history.to_provider()?;
        contents.push(turn_content("user", new_text, attachments)?);

        let generation_config = GenerationConfig {
            temperature: Some(if options.thinking {
                THINKING_TEMPERATURE
            } else {
                DEFAULT_TEMPERATURE
            }),
            thinking_config: options.thinking.then(|| ThinkingConfig {
                thinking_budget: THINKING_BUDGET,
            }),
            ..Default::default()
        };

        Ok(GeminiRequest {
            contents,
            system_instruction: Some(GeminiContent::instruction(persona_instruction())),
            tools: options.search.then(|| vec![GeminiTool::google_search()]),
            generation_config: Some(generation_config),
        })
    }

    pub fn build_transcription_request(&self, audio_base64: &str, mime_type: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent::new(
                "user",
                vec![
                    GeminiPart::inline(mime_type, audio_base64),
                    GeminiPart::text(TRANSCRIBE_INSTRUCTION),
                ],
            )],
            ..Default::default()
        }
    }

    pub fn build_speech_request(&self, text: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent::new("user", vec![GeminiPart::text(text)])],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig::prebuilt(self.models.voice.clone())),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn stream_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, api_key
        )
    }

    fn generate_url(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, api_key
        )
    }

    async fn post(&self, url: &str, request: &GeminiRequest) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(LLMError::Http)?;

        check_status(response).await
    }

    /// One-shot `generateContent` call.
    async fn generate(&self, model: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let api_key = self.api_key()?;
        let response = self.post(&self.generate_url(model, api_key), request).await?;
        let body: GeminiResponse = response.json().await.map_err(LLMError::Http)?;

        if let Some(reason) = body.block_reason() {
            return Err(LLMError::Api(format!("Prompt blocked: {}", reason)));
        }
        Ok(body)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.map_err(LLMError::Http)?;

    if status == 401 || status == 403 {
        return Err(LLMError::Auth(format!(
            "Gemini authentication failed: {}. Please check your API key.",
            text
        )));
    }

    Err(LLMError::Api(format!(
        "Gemini API error: HTTP {}: {}",
        status, text
    )))
}

#[async_trait]
impl ModelClient for GeminiProvider {
    async fn stream_turn(
        &self,
        history: &[Message],
        new_text: &str,
        attachments: &[Attachment],
        options: ChatOptions,
    ) -> Result<TextStream> {
        let api_key = self.api_key()?;
        let model = self.select_model(options);
        let request = self.build_turn_request(history, new_text, attachments, options)?;

        log::debug!(
            "Gemini turn: model={} history={} attachments={} thinking={} search={}",
            model,
            history.len(),
            attachments.len(),
            options.thinking,
            options.search
        );

        let response = self.post(&self.stream_url(model, api_key), &request).await?;

        log::debug!("Gemini stream started successfully");

        let mut state = GeminiStreamState::default();
        let stream = crate::providers::common::sse::text_stream_from_sse(response, move |event, data| {
            parse_gemini_sse_event(&mut state, event, data)
        });

        Ok(stream)
    }

    async fn transcribe(&self, audio_base64: &str, mime_type: &str) -> Result<String> {
        let request = self.build_transcription_request(audio_base64, mime_type);
        let response = self.generate(&self.models.transcription, &request).await?;
        Ok(response.text().unwrap_or_default())
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>> {
        let request = self.build_speech_request(text);
        let response = self.generate(&self.models.speech, &request).await?;

        let audio = response.first_inline_data().ok_or(LLMError::NoAudio)?;
        let bytes = general_purpose::STANDARD.decode(audio.data.as_bytes())?;
        log::debug!("Synthesized {} bytes of {}", bytes.len(), audio.mime_type);
        Ok(bytes)
    }
}
