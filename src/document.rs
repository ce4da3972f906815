//! Input documents: the bytes, name, and content type of one submission.
//!
//! A [`Document`] is immutable once constructed. Loading from a path sniffs
//! the `%PDF` magic bytes to assign the content type, so a correctly named
//! but non-PDF file is rejected by pre-flight validation with a meaningful
//! error instead of a confusing webhook response.

use std::path::Path;

use crate::error::OcrError;

/// PDF files start with these four bytes.
const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The MIME type assigned to inputs that fail magic-byte sniffing.
const OCTET_STREAM: &str = "application/octet-stream";

/// One document to be submitted for OCR.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl Document {
    /// Build a document from raw bytes with an explicit content type.
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Load a document from a file on disk.
    ///
    /// The content type is derived from the file's magic bytes, not its
    /// extension: anything starting with `%PDF` becomes `application/pdf`,
    /// everything else `application/octet-stream`.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, OcrError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| OcrError::Processing(format!("failed to read '{}': {e}", path.display())))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let content_type = sniff_content_type(&bytes);
        tracing::debug!(
            "loaded '{}': {} bytes, {}",
            name,
            bytes.len(),
            content_type
        );

        Ok(Self {
            name,
            content_type: content_type.to_string(),
            bytes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte length of the document.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Map magic bytes to a content type.
fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC {
        "application/pdf"
    } else {
        OCTET_STREAM
    }
}
