//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use harvest::ChatService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::routes::{chat_handler, health_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

/// Build the Axum application router
pub fn build_app(chat: Arc<ChatService>) -> Router {
    let app_state = AppState { chat };

    // The chat page is served from a separate origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/chat", post(chat_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use harvest::testing::MockKnowledgeBase;
    use harvest::{ChatResponse, Citation, Confidence, GenerationError, GroundedAnswer};
    use tower::ServiceExt;

    use crate::server::routes::{ErrorResponse, HealthResponse};

    fn app(knowledge_base: MockKnowledgeBase) -> Router {
        build_app(Arc::new(ChatService::new(Arc::new(knowledge_base))))
    }

    fn answer() -> GroundedAnswer {
        GroundedAnswer {
            text: "The Tonnage Act was passed in 1789.".to_string(),
            citations: vec![Citation {
                source: "s3://harvest-data/extracted/congress_1/hr_5.txt".to_string(),
                excerpt: Some("duties on ships and vessels".to_string()),
            }],
        }
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(MockKnowledgeBase::new(answer()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthResponse = json(response).await;
        assert_eq!(body.status, "healthy");
    }

    #[tokio::test]
    async fn test_chat_answers_with_citations() {
        let response = app(MockKnowledgeBase::new(answer()))
            .oneshot(chat_request(r#"{"question": " When was the Tonnage Act passed? "}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ChatResponse = json(response).await;
        assert_eq!(body.question, "When was the Tonnage Act passed?");
        assert_eq!(body.answer, "The Tonnage Act was passed in 1789.");
        assert_eq!(body.citations.len(), 1);
        assert_eq!(body.confidence, Confidence::High);
    }

    #[tokio::test]
    async fn test_empty_question_is_bad_request() {
        for body in [r#"{"question": "   "}"#, "{}"] {
            let response = app(MockKnowledgeBase::new(answer()))
                .oneshot(chat_request(body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let error: ErrorResponse = json(response).await;
            assert_eq!(error.error, "question is required");
        }
    }

    #[tokio::test]
    async fn test_service_failure_still_answers() {
        let knowledge_base = MockKnowledgeBase::new(answer())
            .then(Err(GenerationError::Service("model unavailable".to_string())));
        let response = app(knowledge_base)
            .oneshot(chat_request(r#"{"question": "Who was Baron de Glaubeck?"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ChatResponse = json(response).await;
        assert_eq!(body.confidence, Confidence::Low);
        assert!(body.citations.is_empty());
    }
}
