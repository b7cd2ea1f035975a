//! Pure Library of Congress REST API client.
//!
//! Covers the two upstream sources of historical documents:
//! - api.congress.gov bill listings and bill text versions
//! - the loc.gov Chronicling America page collection
//!
//! # Example
//!
//! ```rust,ignore
//! use loc_client::LocClient;
//!
//! let client = LocClient::new(Some("congress-api-key".into()))?;
//!
//! let bills = client.list_bills(1, "hr", 250).await?;
//! for bill in &bills {
//!     let versions = client.bill_text_versions(1, "hr", &bill.number).await?;
//!     println!("{} has {} text versions", bill.number, versions.len());
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{LocError, Result};
pub use types::{
    BillSummary, ImageUrls, LatestAction, NewspaperItem, NewspaperQuery, TextFormat, TextVersion,
};

use serde::de::DeserializeOwned;
use std::time::Duration;
use types::{BillListResponse, NewspaperSearchResponse, TextVersionsResponse};

const CONGRESS_BASE_URL: &str = "https://api.congress.gov/v3";
const CHRONICLING_AMERICA_URL: &str = "https://www.loc.gov/collections/chronicling-america/";

/// congress.gov rejects some non-browser clients with an HTML error page.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Clone)]
pub struct LocClient {
    client: reqwest::Client,
    api_key: Option<String>,
    congress_base_url: String,
    newspaper_url: String,
}

impl LocClient {
    /// Create a client. The API key is only sent to api.congress.gov.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_key,
            congress_base_url: CONGRESS_BASE_URL.to_string(),
            newspaper_url: CHRONICLING_AMERICA_URL.to_string(),
        })
    }

    /// Point at a different Congress API base URL (proxies, mirrors).
    pub fn with_congress_base_url(mut self, url: impl Into<String>) -> Self {
        self.congress_base_url = url.into();
        self
    }

    /// Point at a different newspaper collection URL.
    pub fn with_newspaper_url(mut self, url: impl Into<String>) -> Self {
        self.newspaper_url = url.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        tracing::debug!(url, "GET");
        let resp = self.client.get(url).query(params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LocError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn congress_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("format", "json".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// List bills of one type introduced in one Congress.
    pub async fn list_bills(
        &self,
        congress: u32,
        bill_type: &str,
        limit: u32,
    ) -> Result<Vec<BillSummary>> {
        let url = format!("{}/bill/{}/{}", self.congress_base_url, congress, bill_type);
        let mut params = self.congress_params();
        params.push(("limit", limit.to_string()));

        let resp: BillListResponse = self.get_json(&url, &params).await?;
        tracing::info!(congress, bill_type, count = resp.bills.len(), "Fetched bill listing");
        Ok(resp.bills)
    }

    /// Fetch the text versions of a bill, latest first.
    pub async fn bill_text_versions(
        &self,
        congress: u32,
        bill_type: &str,
        number: &str,
    ) -> Result<Vec<TextVersion>> {
        let url = format!(
            "{}/bill/{}/{}/{}/text",
            self.congress_base_url, congress, bill_type, number
        );
        let resp: TextVersionsResponse = self.get_json(&url, &self.congress_params()).await?;
        Ok(resp.text_versions)
    }

    /// Fetch one page of Chronicling America search results.
    pub async fn newspaper_pages(&self, query: &NewspaperQuery) -> Result<Vec<NewspaperItem>> {
        let resp: NewspaperSearchResponse =
            self.get_json(&self.newspaper_url, &query.params()).await?;
        tracing::info!(
            page = query.page,
            count = resp.results.len(),
            "Fetched newspaper search page"
        );
        Ok(resp.results)
    }
}

impl std::fmt::Debug for LocClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("congress_base_url", &self.congress_base_url)
            .field("newspaper_url", &self.newspaper_url)
            .finish()
    }
}
