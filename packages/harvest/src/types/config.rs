//! Configuration types for fetching, extraction and pipeline runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const MIB: usize = 1024 * 1024;

/// Byte-size gates applied after fetch and before any upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeLimits {
    /// Anything smaller is treated as a truncated or empty response
    pub min_bytes: usize,

    /// Largest document the async OCR service accepts
    pub max_bytes: usize,

    /// At or below this size the sync OCR call is tried first
    pub sync_threshold: usize,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            min_bytes: 100,
            max_bytes: 500 * MIB,
            sync_threshold: 5 * MIB,
        }
    }
}

/// Async job polling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(with = "duration_secs")]
    pub interval: Duration,

    #[serde(with = "duration_secs")]
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    /// Upper bound on status checks before giving up.
    pub fn max_polls(&self) -> u64 {
        let interval = self.interval.as_millis().max(1);
        ((self.max_wait.as_millis() / interval) as u64).max(1)
    }
}

/// Configuration for the extraction coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub limits: SizeLimits,
    pub poll: PollConfig,

    /// Bucket that stages source bytes and job output for the async path
    pub temp_bucket: String,

    /// Key prefix for staged source bytes
    pub temp_prefix: String,

    /// Key prefix under which the OCR service writes job output
    pub output_prefix: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            limits: SizeLimits::default(),
            poll: PollConfig::default(),
            temp_bucket: "harvest-temp".to_string(),
            temp_prefix: "temp-ocr".to_string(),
            output_prefix: "ocr-output".to_string(),
        }
    }
}

impl ExtractionConfig {
    pub fn new(temp_bucket: impl Into<String>) -> Self {
        Self {
            temp_bucket: temp_bucket.into(),
            ..Default::default()
        }
    }

    pub fn with_limits(mut self, limits: SizeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_sync_threshold(mut self, bytes: usize) -> Self {
        self.limits.sync_threshold = bytes;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }
}

/// HTTP fetch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: loc_client::BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Settings for one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Bucket receiving extracted text records and the run summary
    pub output_bucket: String,

    /// Minimum spacing between documents, to stay polite to upstream APIs
    pub request_interval: Duration,

    /// Persisted records larger than this are rejected
    pub max_record_bytes: usize,

    pub summary_key: String,

    /// Failure messages kept in the summary
    pub max_reported_errors: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_bucket: "harvest-data".to_string(),
            request_interval: Duration::from_millis(500),
            max_record_bytes: 50 * MIB,
            summary_key: "collection_summary.json".to_string(),
            max_reported_errors: 10,
        }
    }
}

impl PipelineConfig {
    pub fn new(output_bucket: impl Into<String>) -> Self {
        Self {
            output_bucket: output_bucket.into(),
            ..Default::default()
        }
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    pub fn with_max_record_bytes(mut self, bytes: usize) -> Self {
        self.max_record_bytes = bytes;
        self
    }

    pub fn with_summary_key(mut self, key: impl Into<String>) -> Self {
        self.summary_key = key.into();
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
