//! Textract text detection, single-call and job-based.

use async_trait::async_trait;
use aws_sdk_textract::error::ProvideErrorMetadata;
use aws_sdk_textract::operation::detect_document_text::DetectDocumentTextError;
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{
    Block, BlockType as AwsBlockType, Document, DocumentLocation, JobStatus as AwsJobStatus,
    OutputConfig, S3Object,
};
use tracing::debug;

use crate::error::{AsyncOcrError, SyncDetectError};
use crate::traits::ocr::{
    AsyncTextDetector, BlockType, JobPage, JobStatus, StorageLocation, SyncErrorKind,
    SyncTextDetector, TextBlock,
};

fn convert_blocks(blocks: &[Block]) -> Vec<TextBlock> {
    blocks
        .iter()
        .map(|block| TextBlock {
            block_type: match block.block_type() {
                Some(AwsBlockType::Page) => BlockType::Page,
                Some(AwsBlockType::Line) => BlockType::Line,
                Some(AwsBlockType::Word) => BlockType::Word,
                _ => BlockType::Other,
            },
            text: block.text().map(str::to_string),
            page: block.page().and_then(|p| u32::try_from(p).ok()),
        })
        .collect()
}

/// Classify a sync failure by its modeled exception type.
fn classify(err: &DetectDocumentTextError) -> SyncErrorKind {
    match err {
        DetectDocumentTextError::UnsupportedDocumentException(_) => {
            SyncErrorKind::UnsupportedDocument
        }
        DetectDocumentTextError::InvalidParameterException(_) => SyncErrorKind::InvalidParameter,
        DetectDocumentTextError::BadDocumentException(_) => SyncErrorKind::BadDocument,
        DetectDocumentTextError::DocumentTooLargeException(_) => SyncErrorKind::DocumentTooLarge,
        DetectDocumentTextError::ThrottlingException(_)
        | DetectDocumentTextError::ProvisionedThroughputExceededException(_) => {
            SyncErrorKind::Throttled
        }
        _ => SyncErrorKind::Service,
    }
}

pub struct TextractSyncDetector {
    client: aws_sdk_textract::Client,
}

impl TextractSyncDetector {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_textract::Client::new(config),
        }
    }
}

#[async_trait]
impl SyncTextDetector for TextractSyncDetector {
    async fn detect_text(&self, bytes: &[u8]) -> Result<Vec<TextBlock>, SyncDetectError> {
        let output = self
            .client
            .detect_document_text()
            .document(Document::builder().bytes(Blob::new(bytes)).build())
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                let message = err.message().unwrap_or("no message").to_string();
                SyncDetectError::new(classify(&err), message)
            })?;
        Ok(convert_blocks(output.blocks()))
    }

    fn name(&self) -> &str {
        "textract"
    }
}

pub struct TextractAsyncDetector {
    client: aws_sdk_textract::Client,
}

impl TextractAsyncDetector {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_textract::Client::new(config),
        }
    }
}

fn service_error<E: ProvideErrorMetadata + std::fmt::Display>(err: E) -> AsyncOcrError {
    AsyncOcrError::Service(match err.code() {
        Some(code) => format!("{}: {}", code, err.message().unwrap_or("no message")),
        None => err.to_string(),
    })
}

#[async_trait]
impl AsyncTextDetector for TextractAsyncDetector {
    async fn start_job(
        &self,
        source: &StorageLocation,
        output: &StorageLocation,
    ) -> Result<String, AsyncOcrError> {
        let location = DocumentLocation::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&source.bucket)
                    .name(&source.key)
                    .build(),
            )
            .build();
        let output_config = OutputConfig::builder()
            .s3_bucket(&output.bucket)
            .s3_prefix(&output.key)
            .build()
            .map_err(|e| AsyncOcrError::Service(e.to_string()))?;

        let response = self
            .client
            .start_document_text_detection()
            .document_location(location)
            .output_config(output_config)
            .send()
            .await
            .map_err(|e| service_error(e.into_service_error()))?;

        response
            .job_id()
            .map(str::to_string)
            .ok_or_else(|| AsyncOcrError::Service("start response had no job id".to_string()))
    }

    async fn get_job(&self, job_id: &str, next_token: Option<&str>) -> Result<JobPage, AsyncOcrError> {
        let response = self
            .client
            .get_document_text_detection()
            .job_id(job_id)
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| service_error(e.into_service_error()))?;

        let status = match response.job_status() {
            Some(AwsJobStatus::Succeeded) => JobStatus::Succeeded,
            Some(AwsJobStatus::PartialSuccess) => JobStatus::PartialSuccess,
            Some(AwsJobStatus::Failed) => JobStatus::Failed,
            _ => JobStatus::InProgress,
        };
        debug!(job_id, status = ?status, blocks = response.blocks().len(), "Job page");

        Ok(JobPage {
            status,
            blocks: convert_blocks(response.blocks()),
            next_token: response.next_token().map(str::to_string),
            status_message: response.status_message().map(str::to_string),
        })
    }

    fn name(&self) -> &str {
        "textract"
    }
}
