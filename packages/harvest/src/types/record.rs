//! Persisted text records: descriptive headers and output keys.

use serde::{Deserialize, Serialize};

use crate::types::document::safe_key_segment;

/// Which upstream collection a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    CongressBills,
    Newspapers,
}

/// Descriptive metadata written at the top of each persisted text record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RecordHeader {
    Bill {
        congress: u32,
        bill_type: String,
        number: String,
        title: String,
        introduced: Option<String>,
        latest_action: Option<String>,
        latest_action_date: Option<String>,
    },
    NewspaperPage {
        page_id: String,
        title: String,
        date: String,
    },
}

impl RecordHeader {
    pub fn newspaper(
        page_id: impl Into<String>,
        title: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        RecordHeader::NewspaperPage {
            page_id: page_id.into(),
            title: title.into(),
            date: date.into(),
        }
    }

    pub fn source(&self) -> SourceKind {
        match self {
            RecordHeader::Bill { .. } => SourceKind::CongressBills,
            RecordHeader::NewspaperPage { .. } => SourceKind::Newspapers,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            RecordHeader::Bill { title, .. } | RecordHeader::NewspaperPage { title, .. } => title,
        }
    }

    /// Object key the record is persisted under.
    pub fn output_key(&self) -> String {
        match self {
            RecordHeader::Bill {
                congress,
                bill_type,
                number,
                ..
            } => format!(
                "extracted/congress_{}/{}_{}.txt",
                congress,
                bill_type.to_lowercase(),
                number
            ),
            RecordHeader::NewspaperPage { page_id, date, .. } => {
                let year = date
                    .split('-')
                    .next()
                    .filter(|y| !y.is_empty())
                    .unwrap_or("unknown");
                format!(
                    "extracted/newspapers_{}/{}.txt",
                    year,
                    safe_key_segment(page_id)
                )
            }
        }
    }

    /// `#`-comment header block terminated by a `---` rule.
    pub fn render(&self) -> String {
        let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
        match self {
            RecordHeader::Bill {
                congress,
                bill_type,
                number,
                title,
                introduced,
                latest_action,
                latest_action_date,
            } => format!(
                "# Congress {} - {} {}\n# Title: {}\n# Introduced: {}\n# Latest Action: {}\n# Latest Action Date: {}\n\n---\n\n",
                congress,
                bill_type.to_uppercase(),
                number,
                if title.is_empty() { "N/A" } else { title },
                na(introduced),
                na(latest_action),
                na(latest_action_date),
            ),
            RecordHeader::NewspaperPage {
                page_id,
                title,
                date,
            } => format!(
                "# Chronicling America Newspaper\n# Page ID: {}\n# Title: {}\n# Date: {}\n\n---\n\n",
                page_id, title, date
            ),
        }
    }

    /// Header followed by the extracted text.
    pub fn compose(&self, text: &str) -> String {
        let mut out = self.render();
        out.push_str(text);
        out
    }
}
