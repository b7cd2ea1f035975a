//! Gremlin over the HTTP endpoint of a graph database.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::gremlin::Traversal;
use crate::error::{GraphError, GraphResult};
use crate::traits::graph::{GraphClient, GraphConnector};

/// Connects to `https://{endpoint}:{port}/gremlin`.
pub struct HttpGremlinConnector {
    endpoint: String,
    port: u16,
    client: reqwest::Client,
}

impl HttpGremlinConnector {
    pub fn new(endpoint: impl Into<String>, port: u16) -> GraphResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GraphError::Connect(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            port,
            client,
        })
    }

    pub fn url(&self) -> String {
        format!("https://{}:{}/gremlin", self.endpoint, self.port)
    }
}

#[async_trait]
impl GraphConnector for HttpGremlinConnector {
    async fn connect(&self) -> GraphResult<Box<dyn GraphClient>> {
        let mut client = HttpGremlinClient {
            url: self.url(),
            http: self.client.clone(),
            closed: false,
        };
        client
            .submit(Traversal::probe().as_str())
            .await
            .map_err(|e| GraphError::Connect(e.to_string()))?;
        info!(url = %client.url, "Connected to graph database");
        Ok(Box::new(client))
    }
}

struct HttpGremlinClient {
    url: String,
    http: reqwest::Client,
    closed: bool,
}

#[async_trait]
impl GraphClient for HttpGremlinClient {
    async fn submit(&mut self, query: &str) -> GraphResult<Value> {
        if self.closed {
            return Err(GraphError::Query("connection is closed".to_string()));
        }
        debug!(query_len = query.len(), "Submitting gremlin query");

        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "gremlin": query }))
            .send()
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;

        if !status.is_success() {
            if body.to_lowercase().contains("already exists") {
                return Err(GraphError::AlreadyExists(body));
            }
            return Err(GraphError::Query(format!("HTTP {}: {}", status, body)));
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| GraphError::Query(e.to_string()))?;
        Ok(value.pointer("/result/data").cloned().unwrap_or(value))
    }

    async fn close(&mut self) -> GraphResult<()> {
        self.closed = true;
        Ok(())
    }
}
