// ABOUTME: HTTP client the CLI uses to talk to a host's agent.
// ABOUTME: Turns non-2xx replies back into typed errors.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::deploy::DeployResponse;
use super::error::ErrorResponse;
use super::health::HealthResponse;
use crate::deploy::{DeployErrorKind, DeployRequest, ServiceStatus};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent at {url} unreachable: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("agent answered {status}: {}", body.message)]
    Api { status: u16, body: ErrorResponse },

    #[error("unexpected agent reply ({status}): {text}")]
    Unexpected { status: u16, text: String },
}

impl AgentError {
    /// The deployment failure kind reported by the agent, if any.
    pub fn deploy_kind(&self) -> Option<DeployErrorKind> {
        match self {
            AgentError::Api { body, .. } => body.kind,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AgentError::Api { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }
}

/// Client for one agent.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: Client,
    base_url: String,
    deploy_timeout: Duration,
}

impl AgentClient {
    /// Client for the agent on `host:port`.
    pub fn new(host: &str, port: u16, deploy_timeout: Duration) -> Result<Self, AgentError> {
        Self::with_base_url(format!("http://{host}:{port}"), deploy_timeout)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        deploy_timeout: Duration,
    ) -> Result<Self, AgentError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| AgentError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url,
            deploy_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthResponse, AgentError> {
        let url = self.url("/health");
        let response = self.http.get(&url).timeout(QUERY_TIMEOUT).send().await;
        decode(&url, response).await
    }

    /// Run a deployment on the host. Returns once the service is started.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeployResponse, AgentError> {
        let url = self.url("/deploy");
        tracing::debug!(%url, image = %request.image_name, tag = %request.tag, "posting deploy");
        let response = self
            .http
            .post(&url)
            .json(request)
            .timeout(self.deploy_timeout)
            .send()
            .await;
        decode(&url, response).await
    }

    pub async fn status(&self, image_name: &str) -> Result<ServiceStatus, AgentError> {
        let url = self.url("/api/v1/status");
        let response = self
            .http
            .get(&url)
            .query(&[("image_name", image_name)])
            .timeout(QUERY_TIMEOUT)
            .send()
            .await;
        decode(&url, response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn decode<T: DeserializeOwned>(
    url: &str,
    response: reqwest::Result<Response>,
) -> Result<T, AgentError> {
    let transport = |source| AgentError::Transport {
        url: url.to_string(),
        source,
    };

    let response = response.map_err(transport)?;
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(transport);
    }

    let text = response.text().await.map_err(transport)?;
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) => Err(AgentError::Api {
            status: status.as_u16(),
            body,
        }),
        Err(_) => Err(AgentError::Unexpected {
            status: status.as_u16(),
            text,
        }),
    }
}
