// Main entry point for the chat server

use std::sync::Arc;

use anyhow::{Context, Result};
use harvest::aws::{load_config, BedrockKnowledgeBase};
use harvest::ChatService;
use server_core::{server::build_app, telemetry::init_tracing, Config};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("Starting historical document chat server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    let knowledge_base_id = Config::require(&config.knowledge_base_id, "KNOWLEDGE_BASE_ID")?;
    let model_arn = Config::require(&config.model_arn, "MODEL_ARN")?;
    tracing::info!(knowledge_base_id, "Configuration loaded");

    let aws = load_config().await;
    let knowledge_base = BedrockKnowledgeBase::new(&aws, knowledge_base_id, model_arn);
    let app = build_app(Arc::new(ChatService::new(Arc::new(knowledge_base))));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
