//! AWS-backed implementations of the service boundaries.
//!
//! Enabled with the `aws` feature. Each adapter takes a shared
//! [`aws_config::SdkConfig`] so credentials and region resolve once.

pub mod bedrock;
pub mod s3;
pub mod textract;

pub use bedrock::{BedrockGenerator, BedrockIndexSync, BedrockKnowledgeBase};
pub use s3::S3ObjectStore;
pub use textract::{TextractAsyncDetector, TextractSyncDetector};

pub use aws_config::SdkConfig;

/// Resolve region and credentials from the environment.
pub async fn load_config() -> SdkConfig {
    aws_config::load_from_env().await
}
