//! HTTP fetcher over reqwest.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{FetchedDocument, Fetcher};
use crate::types::config::FetchConfig;

/// Fetches documents with a fixed timeout and a browser-like User-Agent.
///
/// Some upstream hosts answer non-browser clients with an HTML error page
/// instead of the document, so the User-Agent matters.
///
/// # Example
///
/// ```rust,ignore
/// use harvest::fetchers::HttpFetcher;
///
/// let fetcher = HttpFetcher::new(FetchConfig::default())?;
/// let doc = fetcher.fetch("https://www.congress.gov/1/bills/hr1/BILLS-1hr1ih.pdf").await?;
/// ```
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn map_error(url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Connection {
                url: url.to_string(),
                source: Box::new(e),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchedDocument> {
        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            Self::map_error(url, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(url, e))?;

        debug!(url = %final_url, bytes = bytes.len(), "HTTP fetch complete");

        let mut doc = FetchedDocument::new(final_url, bytes.to_vec());
        if let Some(ct) = content_type {
            doc = doc.with_content_type(ct);
        }
        Ok(doc)
    }

    fn name(&self) -> &str {
        "http"
    }
}
