use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::registry::AgentKind;
use crate::config::AgentConfig;

/// Wire-level failures, before any fallback policy is applied.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection to {agent} failed: {message}")]
    Connect { agent: AgentKind, message: String },
    #[error("{agent} did not answer before the deadline")]
    Timeout { agent: AgentKind },
    #[error("{agent} returned status {status}: {message}")]
    Status {
        agent: AgentKind,
        status: u16,
        message: String,
    },
    #[error("{agent} returned an unreadable body: {message}")]
    Decode { agent: AgentKind, message: String },
}

/// Request/response exchange with one agent.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// `POST /process` with `payload`, returning the decoded response body.
    async fn post_process(&self, agent: AgentKind, payload: &Value)
        -> Result<Value, TransportError>;

    /// `GET /health`, returning the decoded response body.
    async fn health(&self, agent: AgentKind) -> Result<Value, TransportError>;
}

/// `reqwest`-backed transport addressing each agent by its configured base URL.
///
/// Carries no request timeout of its own; [`super::AgentClient`] bounds every
/// call with the caller's deadline.
pub struct HttpAgentTransport {
    client: Client,
    config: AgentConfig,
}

impl HttpAgentTransport {
    pub fn new(config: &AgentConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("credit-orchestrator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, agent: AgentKind, path: &str) -> String {
        format!("{}/{}", self.config.endpoint(agent), path)
    }

    async fn read_body(
        agent: AgentKind,
        response: reqwest::Response,
    ) -> Result<Value, TransportError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| classify(agent, err))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("error")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(TransportError::Status {
                agent,
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|err| TransportError::Decode {
            agent,
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    async fn post_process(
        &self,
        agent: AgentKind,
        payload: &Value,
    ) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(self.url(agent, "process"))
            .json(payload)
            .send()
            .await
            .map_err(|err| classify(agent, err))?;

        Self::read_body(agent, response).await
    }

    async fn health(&self, agent: AgentKind) -> Result<Value, TransportError> {
        let response = self
            .client
            .get(self.url(agent, "health"))
            .send()
            .await
            .map_err(|err| classify(agent, err))?;

        Self::read_body(agent, response).await
    }
}

fn classify(agent: AgentKind, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { agent }
    } else if err.is_decode() || err.is_body() {
        TransportError::Decode {
            agent,
            message: err.to_string(),
        }
    } else {
        // Refused connections, DNS failures, and resets all mean the agent is unreachable.
        TransportError::Connect {
            agent,
            message: err.to_string(),
        }
    }
}
