//! Upstream API keys, kept out of logs.

use loc_client::LocClient;
use secrecy::{ExposeSecret, SecretString};

/// Congress.gov API access. The key is optional; the API serves a low
/// anonymous quota without one.
///
/// `Debug` never shows the key.
#[derive(Debug, Clone, Default)]
pub struct CongressCredentials {
    pub api_key: Option<SecretString>,
}

impl CongressCredentials {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self { api_key }
    }

    /// Build a source API client carrying the key.
    pub fn client(&self) -> loc_client::Result<LocClient> {
        LocClient::new(
            self.api_key
                .as_ref()
                .map(|key| key.expose_secret().to_string()),
        )
    }
}
