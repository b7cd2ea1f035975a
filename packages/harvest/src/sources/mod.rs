//! Document sources backed by the Library of Congress APIs.

pub mod chronicling;
pub mod congress;

pub use chronicling::{ChroniclingSource, NewspaperRange};
pub use congress::{CongressRange, CongressSource};

use tracing::debug;

/// Whether `raw` is an absolute http(s) URL worth fetching.
pub(crate) fn is_fetchable(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(e) => {
            debug!(url = raw, error = %e, "Skipping malformed candidate URL");
            false
        }
    }
}
