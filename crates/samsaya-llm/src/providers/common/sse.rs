//! Shared SSE -> [`TextStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::provider::{LLMError, Result, TextStream};

fn to_stream_error(err: LLMError) -> LLMError {
    match err {
        LLMError::Stream(msg) => LLMError::Stream(msg),
        LLMError::Api(msg) => LLMError::Api(msg),
        other => LLMError::Stream(other.to_string()),
    }
}

/// Convert an SSE HTTP [`Response`] into a [`TextStream`].
///
/// `handler` receives the SSE event name and data payload for each event, and can either:
/// - return `Ok(Some(text))` to emit a snapshot
/// - return `Ok(None)` to skip an event
/// - return `Err(_)` to emit a stream error
pub fn text_stream_from_sse<H>(response: Response, mut handler: H) -> TextStream
where
    H: FnMut(&str, &str) -> Result<Option<String>> + Send + 'static,
{
    let stream = response
        .bytes_stream()
        .eventsource()
        .map(move |event| {
            let event = event.map_err(|e| LLMError::Stream(e.to_string()))?;
            handler(event.event.as_str(), event.data.as_str()).map_err(to_stream_error)
        })
        .filter_map(|result| async move {
            match result {
                Ok(Some(text)) => Some(Ok(text)),
                Ok(None) => None,
                Err(err) => Some(Err(err)),
            }
        });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn sse_response(body: &'static str) -> (MockServer, Response) {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&mock_server)
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/sse", mock_server.uri()))
            .send()
            .await
            .expect("response");

        (mock_server, response)
    }

    #[tokio::test]
    async fn filters_none_and_passes_event_name_and_data() {
        let (_server, response) = sse_response(concat!(
            "event: token\n",
            "data: hello\n",
            "\n",
            "event: token\n",
            "data: skip\n",
            "\n",
        ))
        .await;

        let mut stream = text_stream_from_sse(response, |event, data| {
            if data == "skip" {
                return Ok(None);
            }
            Ok(Some(format!("{event}:{data}")))
        });

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("text"));
        }

        assert_eq!(out, vec!["token:hello".to_string()]);
    }

    #[tokio::test]
    async fn maps_handler_errors_to_stream_error() {
        let (_server, response) = sse_response(concat!("data: boom\n", "\n")).await;

        let mut stream =
            text_stream_from_sse(response, |_event, _data| Err(LLMError::MissingApiKey));

        let Some(item) = stream.next().await else {
            panic!("expected one stream item");
        };

        match item {
            Ok(text) => panic!("expected error, got text: {text:?}"),
            Err(LLMError::Stream(msg)) => assert!(msg.contains("API key")),
            Err(other) => panic!("expected LLMError::Stream, got: {other:?}"),
        }
    }
}
