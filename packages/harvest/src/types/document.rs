//! Source documents - one unit of extraction work.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::record::RecordHeader;

const PDF_MAGIC: &[u8] = b"%PDF-";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const TIFF_LE_MAGIC: &[u8] = &[b'I', b'I', 0x2A, 0x00];
const TIFF_BE_MAGIC: &[u8] = &[b'M', b'M', 0x00, 0x2A];

/// What a source document contains, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Ready-to-use text; no conversion needed
    PlainText,
    /// HTML or other tagged text; tags are stripped
    Markup,
    /// Needs OCR
    Pdf,
    /// Needs OCR
    Image,
}

impl ContentKind {
    /// Lower is tried first.
    pub fn priority(self) -> u8 {
        match self {
            ContentKind::PlainText => 0,
            ContentKind::Markup => 1,
            ContentKind::Pdf => 2,
            ContentKind::Image => 3,
        }
    }

    /// Whether the document must go through OCR.
    pub fn needs_ocr(self) -> bool {
        matches!(self, ContentKind::Pdf | ContentKind::Image)
    }

    /// Map a Congress.gov format label to a kind.
    pub fn from_format_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Plain Text" => Some(ContentKind::PlainText),
            "Formatted Text" | "HTML" => Some(ContentKind::Markup),
            "PDF" => Some(ContentKind::Pdf),
            _ => None,
        }
    }

    /// Sniff a binary kind from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PDF_MAGIC) {
            Some(ContentKind::Pdf)
        } else if image_mime_type(bytes).is_some() {
            Some(ContentKind::Image)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::PlainText => "plain_text",
            ContentKind::Markup => "markup",
            ContentKind::Pdf => "pdf",
            ContentKind::Image => "image",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MIME type of an image payload, from its signature.
pub fn image_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(JPEG_MAGIC) {
        Some("image/jpeg")
    } else if bytes.starts_with(PNG_MAGIC) {
        Some("image/png")
    } else if bytes.starts_with(TIFF_LE_MAGIC) || bytes.starts_with(TIFF_BE_MAGIC) {
        Some("image/tiff")
    } else {
        None
    }
}

/// Whether a byte stream starts with the PDF signature.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Stable identifier derived from source-specific keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `congress_{congress}_{type}_{number}`
    pub fn bill(congress: u32, bill_type: &str, number: &str) -> Self {
        Self(format!(
            "congress_{}_{}_{}",
            congress,
            bill_type.to_lowercase(),
            number
        ))
    }

    /// `newspaper_{page id}` with path separators flattened.
    pub fn newspaper_page(page_id: &str) -> Self {
        Self(format!("newspaper_{}", safe_key_segment(page_id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Replace characters that would nest or break an object-storage key.
pub fn safe_key_segment(raw: &str) -> String {
    raw.trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| match c {
            '/' | ':' | '?' | '#' | '&' | '=' | ' ' => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

/// One remote document to extract text from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: DocumentId,
    pub url: String,
    /// Declared kind; binary kinds are re-checked against magic bytes
    pub kind: ContentKind,
}

impl SourceDocument {
    pub fn new(id: DocumentId, url: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            id,
            url: url.into(),
            kind,
        }
    }
}

/// One logical document with its candidate renditions.
///
/// Candidates are tried in [`ContentKind::priority`] order until one yields
/// text.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub id: DocumentId,
    pub header: RecordHeader,
    candidates: Vec<SourceDocument>,
    unavailable: Option<String>,
}

impl SourceItem {
    pub fn new(id: DocumentId, header: RecordHeader) -> Self {
        Self {
            id,
            header,
            candidates: Vec::new(),
            unavailable: None,
        }
    }

    /// Record why renditions could not be listed for this item.
    pub fn with_unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    pub fn unavailable(&self) -> Option<&str> {
        self.unavailable.as_deref()
    }

    /// Add a rendition. Candidates stay sorted by priority; ties keep
    /// insertion order.
    pub fn with_candidate(mut self, url: impl Into<String>, kind: ContentKind) -> Self {
        self.candidates
            .push(SourceDocument::new(self.id.clone(), url, kind));
        self.candidates.sort_by_key(|c| c.kind.priority());
        self
    }

    pub fn candidates(&self) -> &[SourceDocument] {
        &self.candidates
    }

    pub fn has_candidates(&self) -> bool {
        !self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_kinds() {
        assert_eq!(ContentKind::sniff(b"%PDF-1.7\n..."), Some(ContentKind::Pdf));
        assert_eq!(
            ContentKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(ContentKind::Image)
        );
        assert_eq!(ContentKind::sniff(b"<!DOCTYPE html>"), None);
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(
            ContentKind::from_format_label("Plain Text"),
            Some(ContentKind::PlainText)
        );
        assert_eq!(
            ContentKind::from_format_label("Formatted Text"),
            Some(ContentKind::Markup)
        );
        assert_eq!(ContentKind::from_format_label("PDF"), Some(ContentKind::Pdf));
        assert_eq!(ContentKind::from_format_label("Formatted XML"), None);
    }

    #[test]
    fn test_document_ids() {
        assert_eq!(DocumentId::bill(3, "HR", "42").as_str(), "congress_3_hr_42");
        assert_eq!(
            DocumentId::newspaper_page("https://www.loc.gov/resource/sn1/1790-01-04/ed-1/?sp=1")
                .as_str(),
            "newspaper_www.loc.gov_resource_sn1_1790-01-04_ed-1__sp_1"
        );
    }

    #[test]
    fn test_candidates_sorted_by_priority() {
        let item = SourceItem::new(
            DocumentId::new("doc"),
            RecordHeader::newspaper("p", "t", "1790-01-01"),
        )
        .with_candidate("https://example.com/a.pdf", ContentKind::Pdf)
        .with_candidate("https://example.com/a.htm", ContentKind::Markup)
        .with_candidate("https://example.com/a.txt", ContentKind::PlainText);

        let kinds: Vec<_> = item.candidates().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ContentKind::PlainText, ContentKind::Markup, ContentKind::Pdf]
        );
    }
}
