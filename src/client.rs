//! Answering service abstraction and its HTTP implementation.
//!
//! The controller only knows the [`AnswerService`] trait. The binary wires in
//! [`HttpAnswerService`]; tests substitute scripted services.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/query` | `{"question", "top_k"}` → `{"answer", "sources"}` |
//! | `GET`  | `/health` | `{"status": "healthy"}` |
//!
//! Failed queries carry an optional `{"detail": "..."}` body. No request is
//! retried here; recovery is the user resubmitting.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::config::EndpointConfig;
use crate::error::QueryError;
use crate::models::{HealthStatus, QueryRequest, QueryResult};

/// A remote service that turns a question into an answer with sources.
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Issue exactly one query. Implementations must not retry.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryError>;
}

/// [`AnswerService`] backed by the `/api/query` HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnswerService {
    http: reqwest::Client,
    endpoint: EndpointConfig,
}

impl HttpAnswerService {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.endpoint.base_url
    }

    /// Fetch `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoint.url("/health");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("health check failed (is the service running at {}?)", self.base_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("health check returned {}: {}", status, body_text);
        }

        response
            .json::<HealthStatus>()
            .await
            .context("invalid health response json")
    }
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult, QueryError> {
        let url = self.endpoint.url("/api/query");
        debug!(%url, top_k = request.top_k, "sending query");

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The status alone decides a remote failure; an unreadable body
            // only loses the detail.
            let detail = response.bytes().await.ok().and_then(|b| extract_detail(&b));
            return Err(QueryError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| QueryError::MalformedBody(e.to_string()))
    }
}

/// Pull the `detail` field out of an error body.
///
/// Strings are used verbatim; structured details (validation error lists,
/// for instance) are kept as compact JSON. Anything unparseable yields `None`.
fn extract_detail(body: &[u8]) -> Option<String> {
    let json: serde_json::Value = serde_json::from_slice(body).ok()?;
    match json.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
