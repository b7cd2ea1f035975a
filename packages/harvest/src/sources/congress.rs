//! Congressional bills from api.congress.gov.

use async_trait::async_trait;
use loc_client::{BillSummary, LocClient, TextVersion};
use tracing::{debug, info, warn};

use super::is_fetchable;
use crate::error::SourceError;
use crate::traits::source::{DocumentSource, SourceCollection};
use crate::types::document::{ContentKind, DocumentId, SourceItem};
use crate::types::record::{RecordHeader, SourceKind};

/// Listing endpoint page size; the API maximum.
pub const BILL_LIST_LIMIT: u32 = 250;

/// Which Congresses and bill types to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongressRange {
    pub start: u32,
    pub end: u32,
    pub bill_types: Vec<String>,
}

impl Default for CongressRange {
    fn default() -> Self {
        Self {
            start: 1,
            end: 16,
            bill_types: ["hr", "s", "hjres", "sjres", "hconres", "sconres", "hres", "sres"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl CongressRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start,
            end,
            ..Default::default()
        }
    }

    pub fn with_bill_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bill_types = types
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }
}

pub struct CongressSource {
    client: LocClient,
    range: CongressRange,
}

impl CongressSource {
    pub fn new(client: LocClient, range: CongressRange) -> Self {
        Self { client, range }
    }

    async fn collect_type(&self, congress: u32, bill_type: &str, listing: &mut SourceCollection) {
        let bills = match self
            .client
            .list_bills(congress, bill_type, BILL_LIST_LIMIT)
            .await
        {
            Ok(bills) => bills,
            Err(e) => {
                warn!(congress, bill_type, error = %e, "Failed to list bills");
                listing
                    .errors
                    .push(format!("Congress {} {}: {}", congress, bill_type, e));
                return;
            }
        };
        if bills.is_empty() {
            debug!(congress, bill_type, "No bills");
            return;
        }

        for bill in &bills {
            let item = match self
                .client
                .bill_text_versions(congress, bill_type, &bill.number)
                .await
            {
                Ok(versions) => bill_item(congress, bill_type, bill, &versions),
                Err(e) => {
                    warn!(congress, bill_type, number = %bill.number, error = %e, "Failed to fetch text versions");
                    bill_item(congress, bill_type, bill, &[])
                        .with_unavailable(format!("text versions unavailable: {}", e))
                }
            };
            listing.items.push(item);
        }
    }
}

#[async_trait]
impl DocumentSource for CongressSource {
    /// Lists every bill type of every Congress in range. A failed listing
    /// is reported and the remaining types still run.
    async fn collect(&self) -> Result<SourceCollection, SourceError> {
        let mut listing = SourceCollection::default();
        for congress in self.range.start..=self.range.end {
            for bill_type in &self.range.bill_types {
                self.collect_type(congress, bill_type, &mut listing).await;
            }
        }
        info!(
            start = self.range.start,
            end = self.range.end,
            items = listing.items.len(),
            errors = listing.errors.len(),
            "Collected bill listings"
        );
        Ok(listing)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::CongressBills
    }

    fn name(&self) -> &str {
        "congress"
    }
}

/// Build the item for one bill from its latest text version.
///
/// A bill without usable text versions yields an item with no candidates.
pub fn bill_item(
    congress: u32,
    bill_type: &str,
    bill: &BillSummary,
    versions: &[TextVersion],
) -> SourceItem {
    let id = DocumentId::bill(congress, bill_type, &bill.number);
    let latest_action = bill.latest_action.as_ref();
    let header = RecordHeader::Bill {
        congress,
        bill_type: bill_type.to_lowercase(),
        number: bill.number.clone(),
        title: bill.title.clone(),
        introduced: bill.introduced_date.clone(),
        latest_action: latest_action.and_then(|a| a.text.clone()),
        latest_action_date: latest_action.and_then(|a| a.action_date.clone()),
    };

    let mut item = SourceItem::new(id, header);
    let Some(latest) = versions.first() else {
        return item;
    };
    for format in &latest.formats {
        let Some(kind) = ContentKind::from_format_label(&format.format_type) else {
            continue;
        };
        if is_fetchable(&format.url) {
            item = item.with_candidate(format.url.clone(), kind);
        }
    }
    item
}
