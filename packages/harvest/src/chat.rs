//! Question answering over the knowledge base.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ChatError;
use crate::retry::BackoffPolicy;
use crate::traits::generator::{Citation, KnowledgeBase};

const FALLBACK_ANSWER: &str = "I could not find an answer to that question in the \
collection right now. Please try rephrasing it or ask again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub question: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: Confidence,
}

pub struct ChatService {
    knowledge_base: Arc<dyn KnowledgeBase>,
    backoff: BackoffPolicy,
}

impl ChatService {
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>) -> Self {
        Self {
            knowledge_base,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Answer `question`. Only an empty question is rejected; service
    /// failures become a low-confidence answer.
    pub async fn ask(&self, question: &str) -> Result<ChatResponse, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let result = self
            .backoff
            .retry(
                || self.knowledge_base.retrieve_and_generate(question),
                |e| e.is_throttled(),
            )
            .await;

        let response = match result {
            Ok(answer) => {
                info!(citations = answer.citations.len(), "Answered question");
                ChatResponse {
                    question: question.to_string(),
                    answer: answer.text,
                    citations: answer.citations,
                    confidence: Confidence::High,
                }
            }
            Err(e) => {
                warn!(error = %e, "Knowledge base query failed, answering with fallback");
                ChatResponse {
                    question: question.to_string(),
                    answer: FALLBACK_ANSWER.to_string(),
                    citations: Vec::new(),
                    confidence: Confidence::Low,
                }
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::testing::MockKnowledgeBase;
    use crate::traits::generator::GroundedAnswer;
    use std::time::Duration;

    fn answer() -> GroundedAnswer {
        GroundedAnswer {
            text: "The act passed in 1790.".to_string(),
            citations: vec![Citation {
                source: "s3://harvest-data/extracted/congress_1/hr_1.txt".to_string(),
                excerpt: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let kb = Arc::new(MockKnowledgeBase::new(answer()));
        let service = ChatService::new(kb.clone());
        assert_eq!(service.ask("   ").await, Err(ChatError::EmptyQuestion));
        assert_eq!(kb.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttling_is_retried() {
        let kb = Arc::new(
            MockKnowledgeBase::new(answer())
                .then(Err(GenerationError::Throttled))
                .then(Err(GenerationError::Throttled)),
        );
        let started = tokio::time::Instant::now();
        let response = ChatService::new(kb.clone()).ask("When?").await.unwrap();

        assert_eq!(response.confidence, Confidence::High);
        assert_eq!(response.citations.len(), 1);
        assert_eq!(kb.call_count(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_service_error_gives_low_confidence_answer() {
        let kb = Arc::new(
            MockKnowledgeBase::new(answer()).then(Err(GenerationError::Service("down".into()))),
        );
        let response = ChatService::new(kb.clone()).ask(" When? ").await.unwrap();

        assert_eq!(response.question, "When?");
        assert_eq!(response.confidence, Confidence::Low);
        assert!(response.citations.is_empty());
        assert_eq!(kb.call_count(), 1);
    }
}
