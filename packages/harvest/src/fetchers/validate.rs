//! Post-fetch validation gate.
//!
//! Runs between download and anything that uploads or invokes OCR. A
//! [`ValidatedDocument`] can only be built here, so holding one proves the
//! checks ran.

use crate::error::ValidationError;
use crate::traits::fetcher::FetchedDocument;
use crate::types::config::SizeLimits;
use crate::types::document::{has_pdf_magic, image_mime_type, ContentKind};

/// Document bytes that passed size, content-type and signature checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDocument {
    kind: ContentKind,
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl ValidatedDocument {
    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type to label the bytes with when staging them.
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Body as UTF-8, for plain text and markup.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

fn is_textual_content_type(content_type: &str) -> bool {
    content_type.starts_with("text/html")
        || content_type.starts_with("text/plain")
        || content_type == "application/xhtml+xml"
}

/// Check a fetched document against the kind it was expected to be.
pub fn validate(
    doc: FetchedDocument,
    expected: ContentKind,
    limits: &SizeLimits,
) -> Result<ValidatedDocument, ValidationError> {
    let len = doc.bytes.len();
    if len < limits.min_bytes {
        return Err(ValidationError::TooSmall {
            len,
            min: limits.min_bytes,
        });
    }
    if len > limits.max_bytes {
        return Err(ValidationError::TooLarge {
            len,
            max: limits.max_bytes,
        });
    }

    if expected.needs_ocr() {
        if let Some(ct) = doc.content_type.as_deref() {
            if is_textual_content_type(ct) {
                return Err(ValidationError::UnexpectedContentType {
                    content_type: ct.to_string(),
                });
            }
        }
    }

    let mime_type = match expected {
        ContentKind::Pdf => {
            if !has_pdf_magic(&doc.bytes) {
                return Err(ValidationError::BadMagic { expected: "pdf" });
            }
            "application/pdf"
        }
        ContentKind::Image => {
            image_mime_type(&doc.bytes).ok_or(ValidationError::BadMagic { expected: "image" })?
        }
        ContentKind::PlainText | ContentKind::Markup => {
            if std::str::from_utf8(&doc.bytes).is_err() {
                return Err(ValidationError::InvalidEncoding);
            }
            if expected == ContentKind::PlainText {
                "text/plain"
            } else {
                "text/html"
            }
        }
    };

    Ok(ValidatedDocument {
        kind: expected,
        bytes: doc.bytes,
        mime_type,
    })
}
