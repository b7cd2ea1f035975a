//! Bedrock model invocation, knowledge-base retrieval and ingestion.

use async_trait::async_trait;
use aws_sdk_bedrockagentruntime::operation::retrieve_and_generate::RetrieveAndGenerateError;
use aws_sdk_bedrockagentruntime::types::{
    KnowledgeBaseRetrieveAndGenerateConfiguration, RetrieveAndGenerateConfiguration,
    RetrieveAndGenerateInput, RetrieveAndGenerateType, RetrievedReference,
};
use aws_sdk_bedrockruntime::operation::converse::ConverseError;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message,
};
use tracing::{debug, info};

use crate::error::{GenerationError, IndexSyncError};
use crate::traits::generator::{Citation, GroundedAnswer, KnowledgeBase, TextGenerator};
use crate::traits::index::{IndexSync, SyncJob};

/// Text generation through the Converse API.
pub struct BedrockGenerator {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockGenerator {
    pub fn new(config: &aws_config::SdkConfig, model_id: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_bedrockruntime::Client::new(config),
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for BedrockGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, GenerationError> {
        let message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(prompt.to_string()))
            .build()
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        let response = self
            .client
            .converse()
            .model_id(&self.model_id)
            .messages(message)
            .inference_config(
                InferenceConfiguration::builder()
                    .max_tokens(i32::try_from(max_tokens).unwrap_or(i32::MAX))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                ConverseError::ThrottlingException(_) => GenerationError::Throttled,
                other => GenerationError::Service(other.to_string()),
            })?;

        let message = response
            .output()
            .and_then(|o| o.as_message().ok())
            .ok_or_else(|| GenerationError::Parse("no message in response".to_string()))?;
        let text: String = message
            .content()
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        debug!(model_id = %self.model_id, chars = text.len(), "Generated text");
        Ok(text)
    }

    fn name(&self) -> &str {
        "bedrock"
    }
}

/// Retrieve-and-generate against a Bedrock knowledge base.
pub struct BedrockKnowledgeBase {
    client: aws_sdk_bedrockagentruntime::Client,
    knowledge_base_id: String,
    model_arn: String,
}

impl BedrockKnowledgeBase {
    pub fn new(
        config: &aws_config::SdkConfig,
        knowledge_base_id: impl Into<String>,
        model_arn: impl Into<String>,
    ) -> Self {
        Self {
            client: aws_sdk_bedrockagentruntime::Client::new(config),
            knowledge_base_id: knowledge_base_id.into(),
            model_arn: model_arn.into(),
        }
    }
}

#[async_trait]
impl KnowledgeBase for BedrockKnowledgeBase {
    async fn retrieve_and_generate(
        &self,
        question: &str,
    ) -> Result<GroundedAnswer, GenerationError> {
        let build_err = |e: aws_sdk_bedrockagentruntime::error::BuildError| {
            GenerationError::Service(e.to_string())
        };
        let input = RetrieveAndGenerateInput::builder()
            .text(question)
            .build()
            .map_err(build_err)?;
        let kb_config = KnowledgeBaseRetrieveAndGenerateConfiguration::builder()
            .knowledge_base_id(&self.knowledge_base_id)
            .model_arn(&self.model_arn)
            .build()
            .map_err(build_err)?;
        let config = RetrieveAndGenerateConfiguration::builder()
            .r#type(RetrieveAndGenerateType::KnowledgeBase)
            .knowledge_base_configuration(kb_config)
            .build()
            .map_err(build_err)?;

        let response = self
            .client
            .retrieve_and_generate()
            .input(input)
            .retrieve_and_generate_configuration(config)
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                RetrieveAndGenerateError::ThrottlingException(_) => GenerationError::Throttled,
                other => GenerationError::Service(other.to_string()),
            })?;

        let text = response
            .output()
            .map(|o| o.text().to_string())
            .unwrap_or_default();
        let citations = response
            .citations()
            .iter()
            .flat_map(|c| c.retrieved_references())
            .filter_map(citation)
            .collect();

        Ok(GroundedAnswer { text, citations })
    }
}

/// Only references backed by a stored object are cited.
fn citation(reference: &RetrievedReference) -> Option<Citation> {
    let uri = reference.location()?.s3_location()?.uri()?;
    Some(Citation {
        source: uri.to_string(),
        excerpt: reference
            .content()
            .map(|c| c.text())
            .filter(|text| !text.is_empty())
            .map(str::to_string),
    })
}

/// Starts knowledge-base ingestion jobs.
pub struct BedrockIndexSync {
    client: aws_sdk_bedrockagent::Client,
    knowledge_base_id: String,
    data_source_id: String,
}

impl BedrockIndexSync {
    pub fn new(
        config: &aws_config::SdkConfig,
        knowledge_base_id: impl Into<String>,
        data_source_id: impl Into<String>,
    ) -> Self {
        Self {
            client: aws_sdk_bedrockagent::Client::new(config),
            knowledge_base_id: knowledge_base_id.into(),
            data_source_id: data_source_id.into(),
        }
    }
}

#[async_trait]
impl IndexSync for BedrockIndexSync {
    async fn start_sync(&self) -> Result<SyncJob, IndexSyncError> {
        let response = self
            .client
            .start_ingestion_job()
            .knowledge_base_id(&self.knowledge_base_id)
            .data_source_id(&self.data_source_id)
            .send()
            .await
            .map_err(|e| IndexSyncError(e.into_service_error().to_string()))?;

        let job = response
            .ingestion_job()
            .ok_or_else(|| IndexSyncError("response had no ingestion job".to_string()))?;
        info!(
            knowledge_base_id = %self.knowledge_base_id,
            job_id = job.ingestion_job_id(),
            "Started ingestion job"
        );
        Ok(SyncJob {
            job_id: job.ingestion_job_id().to_string(),
            status: job.status().as_str().to_string(),
        })
    }
}
