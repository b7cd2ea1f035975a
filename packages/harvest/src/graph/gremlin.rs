//! Gremlin traversal strings.

use std::fmt::Write;

/// Graph property values as they appear in a traversal.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Str(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Str(s)
    }
}

impl From<usize> for PropertyValue {
    fn from(n: usize) -> Self {
        PropertyValue::Int(n as i64)
    }
}

impl From<u32> for PropertyValue {
    fn from(n: u32) -> Self {
        PropertyValue::Int(n as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Float(n)
    }
}

/// Escape a value for a single-quoted Gremlin string literal.
///
/// Line breaks are flattened to spaces.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push(' '),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

fn literal(value: &PropertyValue) -> String {
    match value {
        PropertyValue::Str(s) => format!("'{}'", escape(s)),
        PropertyValue::Int(n) => n.to_string(),
        PropertyValue::Float(n) => n.to_string(),
    }
}

/// Incrementally built traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal(String);

impl Traversal {
    pub fn add_vertex(label: &str) -> Self {
        Self(format!("g.addV('{}')", escape(label)))
    }

    /// Vertex lookup by its `id` property.
    pub fn vertex(id: &str) -> Self {
        Self(format!("g.V().has('id', '{}')", escape(id)))
    }

    /// `g.V().limit(1)`, used to probe a connection.
    pub fn probe() -> Self {
        Self("g.V().limit(1)".to_string())
    }

    /// Every vertex with `label`, as property maps including id and label.
    pub fn value_maps(label: &str) -> Self {
        Self(format!("g.V().hasLabel('{}').valueMap(true)", escape(label)))
    }

    /// Edge between two vertices found by their `id` property.
    pub fn add_edge(label: &str, from_id: &str, to_id: &str) -> Self {
        Self(format!(
            "g.V().has('id', '{}').as('from').V().has('id', '{}').as('to').addE('{}').from('from').to('to')",
            escape(from_id),
            escape(to_id),
            escape(label)
        ))
    }

    pub fn property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        let _ = write!(self.0, ".property('{}', {})", escape(key), literal(&value.into()));
        self
    }

    pub fn property_opt<V: Into<PropertyValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.property(key, v),
            None => self,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Split `text` into pieces of at most `max_chars` characters, on
/// character boundaries.
pub fn chunk_chars(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() || chunks.is_empty() {
        chunks.push(&text[start..]);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("O'Brien said \"hi\"\r\nthen\\left"), "O\\'Brien said \\\"hi\\\" then\\\\left");
    }

    #[test]
    fn test_traversal_building() {
        let q = Traversal::add_vertex("Document")
            .property("id", "doc'1")
            .property("chunk_count", 2usize)
            .property_opt::<&str>("title", None);
        assert_eq!(
            q.as_str(),
            "g.addV('Document').property('id', 'doc\\'1').property('chunk_count', 2)"
        );
    }

    #[test]
    fn test_chunk_chars_multibyte() {
        let text = "é".repeat(5);
        let chunks = chunk_chars(&text, 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
        assert_eq!(chunk_chars("", 10), vec![""]);
        assert_eq!(chunk_chars("abcd", 2), vec!["ab", "cd"]);
    }
}
