//! Text extraction from heterogeneous JSON output.
//!
//! Extraction output stored by earlier runs and by different OCR backends
//! comes in several JSON layouts. Each layout is a named [`TextShape`];
//! shapes are tried in [`TextShape::ORDERED`] order and the first one that
//! matches wins.

use serde_json::Value;

/// A run of text, with the page it came from when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    pub text: String,
    pub page: Option<u32>,
}

impl TextSegment {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page: None,
        }
    }
}

/// One known JSON layout carrying document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextShape {
    /// `{"extractedText": "..."}`
    ExtractedText,
    /// `{"document": {"text": "..."}}`
    DocumentText,
    /// `{"document": {"content": "..."}}`
    DocumentContent,
    /// `{"pages": [{"text": "..."} | {"content": "..."} | "..."]}`
    Pages,
    /// `{"blocks": [{"blockType": "LINE", "text": "..."}]}`
    LineBlocks,
    /// `{"text_lines": ["..." | {"text": "..."}]}`
    TextLines,
    /// `{"content": "..." | ["..."]}`
    Content,
    /// `{"text": "..."}`
    Text,
    /// `{"extraction": {"newspaper_name", "publication_date", "headlines", "articles"}}`
    NewspaperSummary,
}

impl TextShape {
    pub const ORDERED: [TextShape; 9] = [
        TextShape::ExtractedText,
        TextShape::DocumentText,
        TextShape::DocumentContent,
        TextShape::Pages,
        TextShape::LineBlocks,
        TextShape::TextLines,
        TextShape::Content,
        TextShape::Text,
        TextShape::NewspaperSummary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TextShape::ExtractedText => "extracted_text",
            TextShape::DocumentText => "document_text",
            TextShape::DocumentContent => "document_content",
            TextShape::Pages => "pages",
            TextShape::LineBlocks => "line_blocks",
            TextShape::TextLines => "text_lines",
            TextShape::Content => "content",
            TextShape::Text => "text",
            TextShape::NewspaperSummary => "newspaper_summary",
        }
    }

    /// Segments if `value` has this shape and carries non-blank text.
    pub fn extract(self, value: &Value) -> Option<Vec<TextSegment>> {
        let segments = match self {
            TextShape::ExtractedText => single(value.get("extractedText")),
            TextShape::DocumentText => single(value.get("document").and_then(|d| d.get("text"))),
            TextShape::DocumentContent => {
                single(value.get("document").and_then(|d| d.get("content")))
            }
            TextShape::Pages => pages(value.get("pages")?),
            TextShape::LineBlocks => line_blocks(value.get("blocks")?),
            TextShape::TextLines => text_lines(value.get("text_lines")?),
            TextShape::Content => match value.get("content")? {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(TextSegment::new)
                    .collect(),
                other => single(Some(other)),
            },
            TextShape::Text => single(value.get("text")),
            TextShape::NewspaperSummary => {
                let extraction = value.get("extraction").unwrap_or(value);
                newspaper_summary(extraction).map(TextSegment::new).into_iter().collect()
            }
        };

        let segments: Vec<_> = segments
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .collect();
        (!segments.is_empty()).then_some(segments)
    }
}

fn single(value: Option<&Value>) -> Vec<TextSegment> {
    value
        .and_then(Value::as_str)
        .map(TextSegment::new)
        .into_iter()
        .collect()
}

fn pages(value: &Value) -> Vec<TextSegment> {
    let Some(pages) = value.as_array() else {
        return Vec::new();
    };
    pages
        .iter()
        .enumerate()
        .filter_map(|(i, page)| {
            let text = match page {
                Value::String(s) => Some(s.as_str()),
                Value::Object(_) => page
                    .get("text")
                    .and_then(Value::as_str)
                    .or_else(|| page.get("content").and_then(Value::as_str)),
                _ => None,
            }?;
            Some(TextSegment {
                text: text.to_string(),
                page: Some(i as u32 + 1),
            })
        })
        .collect()
}

fn line_blocks(value: &Value) -> Vec<TextSegment> {
    let lines: Vec<&str> = value
        .as_array()
        .into_iter()
        .flatten()
        .filter(|b| b.get("blockType").and_then(Value::as_str) == Some("LINE"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }
    vec![TextSegment::new(lines.join("\n"))]
}

fn text_lines(value: &Value) -> Vec<TextSegment> {
    let lines: Vec<String> = value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|line| match line {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => line.get("text").and_then(Value::as_str).map(str::to_string),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }
    vec![TextSegment::new(lines.join("\n"))]
}

/// Flatten a structured newspaper summary into readable lines.
fn newspaper_summary(extraction: &Value) -> Option<String> {
    let field = |name: &str| {
        extraction
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    let mut parts = Vec::new();
    if let Some(name) = field("newspaper_name") {
        parts.push(format!("Newspaper: {}", name));
    }
    if let Some(date) = field("publication_date") {
        parts.push(format!("Date: {}", date));
    }
    if let Some(headlines) = extraction.get("headlines").and_then(Value::as_array) {
        let headlines: Vec<&str> = headlines.iter().filter_map(Value::as_str).collect();
        if !headlines.is_empty() {
            parts.push(format!("Headlines: {}", headlines.join(", ")));
        }
    }
    for article in extraction
        .get("articles")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(headline) = article.get("headline").and_then(Value::as_str) {
            parts.push(format!("Article: {}", headline));
        }
        if let Some(summary) = article.get("summary").and_then(Value::as_str) {
            parts.push(summary.to_string());
        }
    }

    (!parts.is_empty()).then(|| parts.join("\n"))
}

/// First matching shape for one JSON object.
pub fn match_shape(value: &Value) -> Option<(TextShape, Vec<TextSegment>)> {
    TextShape::ORDERED
        .iter()
        .find_map(|shape| shape.extract(value).map(|segments| (*shape, segments)))
}

/// All text segments in a stored extraction document.
///
/// A top-level array is treated as a list of results: strings are taken
/// as-is and objects are matched individually.
pub fn segments_from_json(value: &Value) -> Vec<TextSegment> {
    match value {
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => vec![TextSegment::new(s.clone())],
                Value::Object(_) => match_shape(item).map(|(_, s)| s).unwrap_or_default(),
                _ => Vec::new(),
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![TextSegment::new(s.clone())],
        Value::Object(_) => match_shape(value).map(|(_, s)| s).unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracted_text_wins_over_pages() {
        let value = json!({
            "extractedText": "whole document",
            "pages": [{"text": "page one"}]
        });
        let (shape, segments) = match_shape(&value).unwrap();
        assert_eq!(shape, TextShape::ExtractedText);
        assert_eq!(segments[0].text, "whole document");
    }

    #[test]
    fn test_pages_mixed_layouts() {
        let value = json!({"pages": [{"text": "one"}, {"content": "two"}, "three", 4]});
        let (shape, segments) = match_shape(&value).unwrap();
        assert_eq!(shape, TextShape::Pages);
        let pages: Vec<_> = segments.iter().map(|s| (s.text.as_str(), s.page)).collect();
        assert_eq!(
            pages,
            vec![("one", Some(1)), ("two", Some(2)), ("three", Some(3))]
        );
    }

    #[test]
    fn test_line_blocks() {
        let value = json!({"blocks": [
            {"blockType": "PAGE"},
            {"blockType": "LINE", "text": "first"},
            {"blockType": "WORD", "text": "first"},
            {"blockType": "LINE", "text": "second"}
        ]});
        let (shape, segments) = match_shape(&value).unwrap();
        assert_eq!(shape, TextShape::LineBlocks);
        assert_eq!(segments[0].text, "first\nsecond");
    }

    #[test]
    fn test_document_content_when_text_blank() {
        let value = json!({"document": {"text": "  ", "content": "body"}});
        let (shape, _) = match_shape(&value).unwrap();
        assert_eq!(shape, TextShape::DocumentContent);
    }

    #[test]
    fn test_newspaper_summary() {
        let value = json!({
            "page_id": "p1",
            "extraction": {
                "newspaper_name": "Pennsylvania Gazette",
                "publication_date": "1790-01-06",
                "headlines": ["Congress Convenes", "Ship News"],
                "articles": [{"headline": "Congress Convenes", "summary": "A quorum appeared."}]
            }
        });
        let (shape, segments) = match_shape(&value).unwrap();
        assert_eq!(shape, TextShape::NewspaperSummary);
        assert_eq!(
            segments[0].text,
            "Newspaper: Pennsylvania Gazette\nDate: 1790-01-06\nHeadlines: Congress Convenes, Ship News\nArticle: Congress Convenes\nA quorum appeared."
        );
    }

    #[test]
    fn test_top_level_array() {
        let value = json!(["plain", {"text": "object"}, {"unknown": 1}]);
        let texts: Vec<_> = segments_from_json(&value)
            .into_iter()
            .map(|s| s.text)
            .collect();
        assert_eq!(texts, vec!["plain", "object"]);
    }

    #[test]
    fn test_no_match() {
        assert!(match_shape(&json!({"metadata": {}})).is_none());
    }
}
