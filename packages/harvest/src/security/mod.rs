//! Secret handling for upstream API keys.

pub mod credentials;

pub use credentials::CongressCredentials;
pub use secrecy::{ExposeSecret, SecretString};
