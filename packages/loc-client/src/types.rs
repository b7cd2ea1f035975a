use serde::{Deserialize, Deserializer};

/// Response wrapper for `GET /v3/bill/{congress}/{type}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BillListResponse {
    #[serde(default)]
    pub bills: Vec<BillSummary>,
}

/// One bill from a Congress.gov listing.
#[derive(Debug, Clone, Deserialize)]
pub struct BillSummary {
    #[serde(default)]
    pub congress: Option<u32>,
    #[serde(deserialize_with = "string_or_number")]
    pub number: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub bill_type: Option<String>,
    #[serde(rename = "introducedDate", default)]
    pub introduced_date: Option<String>,
    #[serde(rename = "latestAction", default)]
    pub latest_action: Option<LatestAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestAction {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "actionDate", default)]
    pub action_date: Option<String>,
}

/// Response wrapper for `GET /v3/bill/{congress}/{type}/{number}/text`.
#[derive(Debug, Clone, Deserialize)]
pub struct TextVersionsResponse {
    #[serde(rename = "textVersions", default)]
    pub text_versions: Vec<TextVersion>,
}

/// A published version of a bill's text (introduced, enrolled, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct TextVersion {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "type", default)]
    pub version_type: Option<String>,
    #[serde(default)]
    pub formats: Vec<TextFormat>,
}

/// A downloadable rendition of a text version.
#[derive(Debug, Clone, Deserialize)]
pub struct TextFormat {
    /// "Plain Text", "Formatted Text", "HTML", "PDF", "Formatted XML"
    #[serde(rename = "type")]
    pub format_type: String,
    pub url: String,
}

/// Query for the Chronicling America page collection.
#[derive(Debug, Clone)]
pub struct NewspaperQuery {
    pub start_year: u32,
    pub end_year: u32,
    /// Results per page (`c`)
    pub per_page: u32,
    /// 1-based result page (`sp`)
    pub page: u32,
}

impl NewspaperQuery {
    pub fn new(start_year: u32, end_year: u32) -> Self {
        Self {
            start_year,
            end_year,
            per_page: 100,
            page: 1,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dl", "page".to_string()),
            ("dates", format!("{}/{}", self.start_year, self.end_year)),
            ("fo", "json".to_string()),
            ("c", self.per_page.to_string()),
            ("sp", self.page.to_string()),
        ]
    }
}

/// Response wrapper for the loc.gov collection search.
#[derive(Debug, Clone, Deserialize)]
pub struct NewspaperSearchResponse {
    #[serde(default)]
    pub results: Vec<NewspaperItem>,
}

/// One digitized newspaper page.
#[derive(Debug, Clone, Deserialize)]
pub struct NewspaperItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub image_url: ImageUrls,
}

/// `image_url` is either a single string or a list of strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum ImageUrls {
    One(String),
    Many(Vec<serde_json::Value>),
    #[default]
    None,
}

impl NewspaperItem {
    /// First IIIF JPEG rendition of the page, if any.
    pub fn iiif_image_url(&self) -> Option<&str> {
        let is_iiif = |url: &str| url.contains("iiif") && url.contains(".jpg");
        match &self.image_url {
            ImageUrls::One(url) if is_iiif(url) => Some(url.as_str()),
            ImageUrls::Many(urls) => urls
                .iter()
                .filter_map(|v| v.as_str())
                .find(|url| is_iiif(url)),
            _ => None,
        }
    }

    /// Full-resolution PDF rendition derived from the IIIF image URL.
    ///
    /// The listing returns thumbnails (`pct:6.25`); the IIIF server renders
    /// any region/size as PDF when the extension is swapped.
    pub fn pdf_url(&self) -> Option<String> {
        let iiif = self.iiif_image_url()?;
        let full = iiif.replace("/pct:6.25/", "/full/").replace(".jpg", ".pdf");
        Some(full.split('#').next().unwrap_or_default().to_string())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}
