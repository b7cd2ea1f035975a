//! Document download and the post-fetch validation gate.

pub mod http;
pub mod validate;

pub use http::HttpFetcher;
pub use validate::{validate, ValidatedDocument};
