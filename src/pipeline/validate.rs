//! Pre-flight validation: reject bad inputs before any network activity.
//!
//! Violations are classified as `validation` errors and are never retried —
//! the attempt budget is reserved for failures a retry could actually fix.

use crate::config::OcrConfig;
use crate::document::Document;
use crate::error::OcrError;

/// Check a document against the configured constraints.
///
/// Checks run in order: content type, size limit, emptiness. The first
/// violation wins.
pub fn preflight(doc: &Document, config: &OcrConfig) -> Result<(), OcrError> {
    if doc.content_type() != config.accepted_type {
        return Err(OcrError::UnsupportedType {
            content_type: doc.content_type().to_string(),
            accepted: config.accepted_type.clone(),
        });
    }

    if doc.len() > config.max_file_size {
        return Err(OcrError::TooLarge {
            size: doc.len(),
            limit: config.max_file_size,
        });
    }

    if doc.is_empty() {
        return Err(OcrError::EmptyFile);
    }

    Ok(())
}
