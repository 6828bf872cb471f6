//! Binary payloads bound to a single turn.
//!
//! Payloads travel as base64 the whole way: they are read from disk as a data URL,
//! split into mime type and payload, and sent to the backend as inline data.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Not a data URL: {0}")]
    NotDataUrl(String),

    #[error("Data URL has no payload separator")]
    MissingPayload,

    #[error("Data URL has no mime type")]
    MissingMimeType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub mime_type: String,
    /// Base64 payload without the data-URL prefix.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Encode raw bytes into an attachment.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, general_purpose::STANDARD.encode(bytes))
    }

    /// Split a `data:<mime>;base64,<payload>` URL into mime type and payload.
    pub fn from_data_url(url: &str) -> Result<Self, AttachmentError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| AttachmentError::NotDataUrl(url.chars().take(32).collect()))?;

        let (header, payload) = rest.split_once(',').ok_or(AttachmentError::MissingPayload)?;
        let mime_type = header.split(';').next().unwrap_or_default();
        if mime_type.is_empty() {
            return Err(AttachmentError::MissingMimeType);
        }

        Ok(Self::new(mime_type, payload))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.mime_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_data_url() {
        let att = Attachment::from_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(att.mime_type, "image/png");
        assert_eq!(att.data, "iVBORw0KGgo=");
        assert!(att.name.is_none());
    }

    #[test]
    fn data_url_round_trips_through_bytes() {
        let att = Attachment::from_bytes("text/plain", b"hello").with_name("note.txt");
        let parsed = Attachment::from_data_url(&att.to_data_url()).unwrap();
        assert_eq!(parsed.mime_type, "text/plain");
        assert_eq!(parsed.data, "aGVsbG8=");
        assert_eq!(att.display_name(), "note.txt");
    }

    #[test]
    fn rejects_plain_strings() {
        assert!(matches!(
            Attachment::from_data_url("image/png;base64,abc"),
            Err(AttachmentError::NotDataUrl(_))
        ));
        assert!(matches!(
            Attachment::from_data_url("data:image/png;base64"),
            Err(AttachmentError::MissingPayload)
        ));
        assert!(matches!(
            Attachment::from_data_url("data:;base64,abc"),
            Err(AttachmentError::MissingMimeType)
        ));
    }

    #[test]
    fn serializes_camel_case() {
        let att = Attachment::new("application/pdf", "JVBERi0=");
        let json = serde_json::to_value(&att).unwrap();
        assert_eq!(json["mimeType"], "application/pdf");
        assert!(json.get("name").is_none());
    }
}
