//! Digitized newspaper pages from Chronicling America.

use async_trait::async_trait;
use loc_client::{LocClient, NewspaperItem, NewspaperQuery};
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::traits::source::{DocumentSource, SourceCollection};
use crate::types::document::{ContentKind, DocumentId, SourceItem};
use crate::types::record::{RecordHeader, SourceKind};

const RESULTS_PER_PAGE: u32 = 100;

/// Publication years and item budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewspaperRange {
    pub start_year: u32,
    pub end_year: u32,
    pub max_pages: usize,
}

impl Default for NewspaperRange {
    fn default() -> Self {
        Self {
            start_year: 1760,
            end_year: 1820,
            max_pages: 1000,
        }
    }
}

impl NewspaperRange {
    pub fn new(start_year: u32, end_year: u32) -> Self {
        Self {
            start_year,
            end_year,
            ..Default::default()
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

pub struct ChroniclingSource {
    client: LocClient,
    range: NewspaperRange,
}

impl ChroniclingSource {
    pub fn new(client: LocClient, range: NewspaperRange) -> Self {
        Self { client, range }
    }
}

#[async_trait]
impl DocumentSource for ChroniclingSource {
    /// Pages through search results until they run out or `max_pages`
    /// newspaper pages with a PDF rendition have been found.
    ///
    /// A failed first page fails the source; a later failure ends paging
    /// and is reported with the items found so far.
    async fn collect(&self) -> Result<SourceCollection, SourceError> {
        let mut listing = SourceCollection::default();
        let mut page = 1;

        while listing.items.len() < self.range.max_pages {
            let query = NewspaperQuery::new(self.range.start_year, self.range.end_year)
                .with_per_page(RESULTS_PER_PAGE)
                .with_page(page);
            let results = match self.client.newspaper_pages(&query).await {
                Ok(results) => results,
                Err(e) if page == 1 => return Err(e.into()),
                Err(e) => {
                    warn!(page, error = %e, "Stopping newspaper search after failed page");
                    listing
                        .errors
                        .push(format!("Newspaper search page {}: {}", page, e));
                    break;
                }
            };
            if results.is_empty() {
                debug!(page, "No more newspaper results");
                break;
            }

            for result in &results {
                if listing.items.len() >= self.range.max_pages {
                    break;
                }
                match newspaper_item(result) {
                    Some(item) => listing.items.push(item),
                    None => debug!(id = ?result.id, "No IIIF rendition"),
                }
            }
            page += 1;
        }

        info!(
            start_year = self.range.start_year,
            end_year = self.range.end_year,
            items = listing.items.len(),
            "Collected newspaper pages"
        );
        Ok(listing)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Newspapers
    }

    fn name(&self) -> &str {
        "chronicling-america"
    }
}

/// Item for one search result, or `None` when it has no IIIF image.
pub fn newspaper_item(result: &NewspaperItem) -> Option<SourceItem> {
    let pdf_url = result.pdf_url()?;
    let page_id = result.id.clone().unwrap_or_else(|| "Unknown".to_string());
    let header = RecordHeader::newspaper(
        page_id.clone(),
        result.title.clone().unwrap_or_else(|| "Unknown".to_string()),
        result.date.clone().unwrap_or_default(),
    );
    Some(
        SourceItem::new(DocumentId::newspaper_page(&page_id), header)
            .with_candidate(pdf_url, ContentKind::Pdf),
    )
}
