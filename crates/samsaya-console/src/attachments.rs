//! Pending payloads for the next outgoing turn.

use std::path::Path;

use samsaya_core::Attachment;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttachmentLoadError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] samsaya_core::AttachmentError),
}

/// Accept hint shown at the input boundary. Not enforced.
pub const ACCEPT_HINT: &str = "image/*, text/*, application/pdf";

/// Mime type for a file name, by extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "webm" => "audio/webm",
        "mp4" | "m4a" => "audio/mp4",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// Read a local file into an attachment through its data-URL encoding.
pub async fn load_file(path: &Path) -> Result<Attachment, AttachmentLoadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AttachmentLoadError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let data_url = Attachment::from_bytes(mime_for_path(path), &bytes).to_data_url();
    let mut attachment = Attachment::from_data_url(&data_url)?;
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        attachment = attachment.with_name(name);
    }

    log::debug!(
        "Loaded attachment {} ({}, {} bytes)",
        attachment.display_name(),
        attachment.mime_type,
        bytes.len()
    );
    Ok(attachment)
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentManager {
    pending: Vec<Attachment>,
}

impl AttachmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attachment: Attachment) {
        self.pending.push(attachment);
    }

    /// Load `path` and append it. Nothing is added when the file cannot be read.
    pub async fn add_file(&mut self, path: &Path) -> Result<&Attachment, AttachmentLoadError> {
        let attachment = load_file(path).await?;
        self.pending.push(attachment);
        Ok(&self.pending[self.pending.len() - 1])
    }

    /// Remove the attachment at `index`; out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        if index < self.pending.len() {
            Some(self.pending.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Snapshot of the pending list, leaving it empty.
    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.pending)
    }

    pub fn list(&self) -> &[Attachment] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
