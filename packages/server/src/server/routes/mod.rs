mod chat;
mod health;

pub use chat::{chat_handler, ChatRequest, ErrorResponse};
pub use health::{health_handler, HealthResponse};
