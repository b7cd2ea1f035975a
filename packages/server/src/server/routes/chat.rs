use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use harvest::ChatError;
use serde::{Deserialize, Serialize};

use crate::server::app::AppState;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Answer a question from the indexed collection.
///
/// Returns 400 for an empty or missing question. Upstream failures still
/// answer 200 with a low-confidence response.
pub async fn chat_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    match state.chat.ask(&request.question).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e @ ChatError::EmptyQuestion) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
