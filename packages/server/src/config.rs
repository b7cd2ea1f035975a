use anyhow::{Context, Result};
use dotenvy::dotenv;
use harvest::{CongressRange, NewspaperRange, SecretString};
use std::env;
use std::str::FromStr;

pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";

/// Application configuration loaded from environment variables
///
/// Only `PORT` and the collection ranges have defaults. Everything that names
/// a cloud resource is optional here and checked with [`Config::require`] by
/// the command that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bucket_name: Option<String>,
    pub congress_api_key: Option<SecretString>,
    pub congress: CongressRange,
    pub newspapers: NewspaperRange,
    pub knowledge_base_id: Option<String>,
    pub data_source_id: Option<String>,
    pub model_arn: Option<String>,
    pub model_id: String,
    pub neptune_endpoint: Option<String>,
    pub neptune_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let defaults = CongressRange::default();
        let mut congress = CongressRange::new(
            parse_or(&var, "START_CONGRESS", defaults.start)?,
            parse_or(&var, "END_CONGRESS", defaults.end)?,
        );
        if let Some(types) = var("BILL_TYPES") {
            congress = congress.with_bill_types(types.split(','));
        }

        let defaults = NewspaperRange::default();
        let newspapers = NewspaperRange::new(
            parse_or(&var, "START_YEAR", defaults.start_year)?,
            parse_or(&var, "END_YEAR", defaults.end_year)?,
        )
        .with_max_pages(parse_or(&var, "MAX_NEWSPAPER_PAGES", defaults.max_pages)?);

        Ok(Self {
            port: parse_or(&var, "PORT", 8080)?,
            bucket_name: var("BUCKET_NAME"),
            congress_api_key: var("CONGRESS_API_KEY").map(SecretString::from),
            congress,
            newspapers,
            knowledge_base_id: var("KNOWLEDGE_BASE_ID"),
            data_source_id: var("DATA_SOURCE_ID"),
            model_arn: var("MODEL_ARN"),
            model_id: var("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            neptune_endpoint: var("NEPTUNE_ENDPOINT"),
            neptune_port: parse_or(&var, "NEPTUNE_PORT", 8182)?,
        })
    }

    /// Value of an optional setting that the current command needs.
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value
            .as_deref()
            .with_context(|| format!("{} must be set", name))
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        None => Ok(default),
    }
}
