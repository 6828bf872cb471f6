//! Gemini SSE stream parser.
//!
//! With `alt=sse` Gemini sends one JSON response object per event, each carrying the
//! next slice of text:
//! ```text
//! data: {"candidates":[{"content":{"parts":[{"text":"Saṃśaya "}],"role":"model"}}]}
//!
//! data: {"candidates":[{"content":{"parts":[{"text":"is doubt."}],"role":"model"},"finishReason":"STOP"}]}
//! ```
//! The console replaces the displayed text with every snapshot, so the parser folds the
//! slices into the cumulative text and emits that.

use crate::protocol::gemini::GeminiResponse;
use crate::provider::{LLMError, Result};

/// Stateful parser for Gemini SSE streaming events.
#[derive(Default)]
pub struct GeminiStreamState {
    /// Full text received so far
    text: String,
    finish_reason: Option<String>,
}

impl GeminiStreamState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }
}

/// Parse a single Gemini SSE event into an optional cumulative snapshot.
///
/// Returns:
/// - `Ok(Some(text))` when the event added text; `text` is everything received so far
/// - `Ok(None)` for events without answer text (empty data, metadata, reasoning parts)
/// - `Err(_)` for malformed JSON, API errors, or blocked prompts
///
/// # Example
///
/// ```
/// use samsaya_llm::providers::gemini::{GeminiStreamState, parse_gemini_sse_event};
///
/// let mut state = GeminiStreamState::default();
/// let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"}}]}"#;
///
/// let snapshot = parse_gemini_sse_event(&mut state, "", data).unwrap();
/// assert_eq!(snapshot.as_deref(), Some("Hello"));
/// ```
pub fn parse_gemini_sse_event(
    state: &mut GeminiStreamState,
    _event_type: &str,
    data: &str,
) -> Result<Option<String>> {
    let data = data.trim();

    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| LLMError::Stream(format!("Failed to parse Gemini SSE data: {}: {}", e, data)))?;

    if let Some(error) = value.get("error") {
        let error_msg = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown Gemini API error");
        return Err(LLMError::Api(error_msg.to_string()));
    }

    let response: GeminiResponse = serde_json::from_value(value)
        .map_err(|e| LLMError::Stream(format!("Unexpected Gemini chunk shape: {}: {}", e, data)))?;

    if response.candidates.is_empty() {
        if let Some(reason) = response.block_reason() {
            return Err(LLMError::Api(format!("Prompt blocked: {}", reason)));
        }
        return Ok(None);
    }

    if let Some(reason) = response.candidates[0].finish_reason.as_ref() {
        if reason != "STOP" {
            log::debug!("Gemini stream finished with reason {}", reason);
        }
        state.finish_reason = Some(reason.clone());
    }

    match response.text() {
        Some(delta) => {
            state.text.push_str(&delta);
            Ok(Some(state.text.clone()))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_chunk() {
        let mut state = GeminiStreamState::default();
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"}}]}"#;

        let snapshot = parse_gemini_sse_event(&mut state, "", data)
            .unwrap()
            .expect("snapshot");

        assert_eq!(snapshot, "Hello");
    }

    #[test]
    fn consecutive_chunks_yield_cumulative_text() {
        let mut state = GeminiStreamState::default();

        let data1 = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "}],"role":"model"}}]}"#;
        let data2 = r#"{"candidates":[{"content":{"parts":[{"text":"world!"}],"role":"model"},"finishReason":"STOP"}]}"#;

        let first = parse_gemini_sse_event(&mut state, "", data1).unwrap().expect("first");
        let second = parse_gemini_sse_event(&mut state, "", data2).unwrap().expect("second");

        assert_eq!(first, "Hello ");
        assert_eq!(second, "Hello world!");
        assert!(second.starts_with(&first));
        assert_eq!(state.finish_reason(), Some("STOP"));
    }

    #[test]
    fn parse_empty_data_returns_none() {
        let mut state = GeminiStreamState::default();
        assert!(parse_gemini_sse_event(&mut state, "", "").unwrap().is_none());
        assert!(parse_gemini_sse_event(&mut state, "", "   [DONE]   ").unwrap().is_none());
    }

    #[test]
    fn thought_parts_do_not_reach_the_text() {
        let mut state = GeminiStreamState::default();
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"considering sources","thought":true}],"role":"model"}}]}"#;

        assert!(parse_gemini_sse_event(&mut state, "", data).unwrap().is_none());
        assert_eq!(state.text(), "");
    }

    #[test]
    fn parse_empty_candidates_returns_none() {
        let mut state = GeminiStreamState::default();
        let data = r#"{"candidates":[],"usageMetadata":{"totalTokenCount":12}}"#;

        assert!(parse_gemini_sse_event(&mut state, "", data).unwrap().is_none());
    }

    #[test]
    fn parse_missing_content_returns_none() {
        let mut state = GeminiStreamState::default();
        let data = r#"{"candidates":[{"finishReason":"STOP"}]}"#;

        assert!(parse_gemini_sse_event(&mut state, "", data).unwrap().is_none());
    }

    #[test]
    fn parse_error_response() {
        let mut state = GeminiStreamState::default();
        let data = r#"{"error":{"message":"API key invalid","code":401}}"#;

        let err = parse_gemini_sse_event(&mut state, "", data).unwrap_err();
        assert!(err.to_string().contains("API key invalid"));
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let mut state = GeminiStreamState::default();
        let data = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;

        let err = parse_gemini_sse_event(&mut state, "", data).unwrap_err();
        assert!(matches!(err, LLMError::Api(msg) if msg.contains("SAFETY")));
    }

    #[test]
    fn parse_invalid_json() {
        let mut state = GeminiStreamState::default();
        let result = parse_gemini_sse_event(&mut state, "", "{invalid json}");
        assert!(matches!(result, Err(LLMError::Stream(_))));
    }
}
