use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::fallback::fallback_payload;
use super::outcome::{StageFailure, StageResult};
use super::payloads::AgentPayload;
use super::registry::{AgentKind, UnknownAgent};
use super::transport::{AgentTransport, HttpAgentTransport, TransportError};
use crate::config::AgentConfig;

/// Calls registered agents and applies the fallback policy.
///
/// Connection failures resolve to [`StageResult::Unavailable`] with the
/// agent's static fallback. Timeouts resolve to [`StageFailure::Timeout`] and
/// are never defaulted. No retries happen here.
#[derive(Clone)]
pub struct AgentClient {
    transport: Arc<dyn AgentTransport>,
    timeout: Duration,
}

impl AgentClient {
    pub fn new(transport: Arc<dyn AgentTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn from_config(config: &AgentConfig) -> Result<Self, reqwest::Error> {
        let transport = HttpAgentTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Calls an agent by registry name with an explicit deadline.
    pub async fn call(
        &self,
        agent_name: &str,
        payload: &Value,
        timeout: Duration,
    ) -> Result<StageResult<Value>, UnknownAgent> {
        let agent: AgentKind = agent_name.parse()?;
        Ok(self.call_with_timeout(agent, payload, timeout).await)
    }

    /// Calls `agent` with the configured deadline.
    pub async fn call_agent(&self, agent: AgentKind, payload: &Value) -> StageResult<Value> {
        self.call_with_timeout(agent, payload, self.timeout).await
    }

    /// Calls `agent` and parses the result into its typed payload.
    pub async fn call_typed<T: AgentPayload>(
        &self,
        agent: AgentKind,
        payload: &Value,
    ) -> StageResult<T> {
        match self.call_agent(agent, payload).await {
            StageResult::Ok(value) => match T::from_result(value) {
                Ok(parsed) => StageResult::Ok(parsed),
                Err(message) => {
                    warn!(agent = %agent, %message, "agent result failed validation");
                    StageResult::Failed(StageFailure::MalformedResponse { message })
                }
            },
            StageResult::Unavailable(value) => match T::from_result(value) {
                Ok(parsed) => StageResult::Unavailable(parsed),
                Err(message) => StageResult::Failed(StageFailure::MalformedResponse { message }),
            },
            StageResult::Failed(failure) => StageResult::Failed(failure),
        }
    }

    pub async fn call_with_timeout(
        &self,
        agent: AgentKind,
        payload: &Value,
        timeout: Duration,
    ) -> StageResult<Value> {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let attempt = tokio::time::timeout(timeout, self.transport.post_process(agent, payload)).await;

        match attempt {
            Err(_) | Ok(Err(TransportError::Timeout { .. })) => {
                warn!(agent = %agent, timeout_ms = millis, "agent request timed out");
                StageResult::Failed(StageFailure::Timeout { millis })
            }
            Ok(Err(TransportError::Connect { message, .. })) => {
                warn!(agent = %agent, %message, "agent unavailable, using fallback result");
                StageResult::Unavailable(fallback_payload(agent, payload))
            }
            Ok(Err(TransportError::Status {
                status, message, ..
            })) => {
                warn!(agent = %agent, status, %message, "agent returned an error status");
                StageResult::Failed(StageFailure::AgentError {
                    status: Some(status),
                    message,
                })
            }
            Ok(Err(TransportError::Decode { message, .. })) => {
                warn!(agent = %agent, %message, "agent returned an unreadable body");
                StageResult::Failed(StageFailure::MalformedResponse { message })
            }
            Ok(Ok(body)) => {
                debug!(agent = %agent, "agent responded");
                unwrap_envelope(body)
            }
        }
    }

    /// Checks one agent's `/health` endpoint.
    pub async fn health(&self, agent: AgentKind) -> AgentHealth {
        let checked_at = Utc::now();
        match tokio::time::timeout(self.timeout, self.transport.health(agent)).await {
            Ok(Ok(body)) => AgentHealth {
                agent,
                reachable: true,
                service: body
                    .get("service")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                error: None,
                checked_at,
            },
            Ok(Err(err)) => AgentHealth::unreachable(agent, err.to_string(), checked_at),
            Err(_) => AgentHealth::unreachable(
                agent,
                "health check timed out".to_string(),
                checked_at,
            ),
        }
    }

    /// Checks every registered agent in registry order.
    pub async fn health_all(&self) -> Vec<AgentHealth> {
        let mut report = Vec::with_capacity(AgentKind::ALL.len());
        for agent in AgentKind::ALL {
            report.push(self.health(agent).await);
        }
        report
    }
}

/// Result of an agent liveness check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentHealth {
    pub agent: AgentKind,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl AgentHealth {
    fn unreachable(agent: AgentKind, error: String, checked_at: DateTime<Utc>) -> Self {
        Self {
            agent,
            reachable: false,
            service: None,
            error: Some(error),
            checked_at,
        }
    }
}

/// Extracts `result` from a `{success, result, service}` envelope.
fn unwrap_envelope(body: Value) -> StageResult<Value> {
    let success = body.get("success").and_then(Value::as_bool);
    if success == Some(false) {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("agent reported failure")
            .to_string();
        return StageResult::Failed(StageFailure::AgentError {
            status: None,
            message,
        });
    }

    let Value::Object(mut envelope) = body else {
        return StageResult::Failed(StageFailure::MalformedResponse {
            message: "response body is not an object".to_string(),
        });
    };

    if success.is_none() {
        return StageResult::Failed(StageFailure::MalformedResponse {
            message: "response envelope is missing `success`".to_string(),
        });
    }

    match envelope.remove("result") {
        Some(result) => {
            if let Some(message) = result.get("error").and_then(Value::as_str) {
                return StageResult::Failed(StageFailure::AgentError {
                    status: None,
                    message: message.to_string(),
                });
            }
            StageResult::Ok(result)
        }
        None => StageResult::Failed(StageFailure::MalformedResponse {
            message: "response envelope is missing `result`".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credit::agents::payloads::{FraudVerdict, ScoreResult};
    use crate::workflows::credit::agents::StageStatus;
    use async_trait::async_trait;
    use serde_json::json;

    enum Behavior {
        Respond(Value),
        Refuse,
        Stall,
        Status(u16, &'static str),
    }

    struct StubTransport(Behavior);

    #[async_trait]
    impl AgentTransport for StubTransport {
        async fn post_process(
            &self,
            agent: AgentKind,
            _payload: &Value,
        ) -> Result<Value, TransportError> {
            match &self.0 {
                Behavior::Respond(body) => Ok(body.clone()),
                Behavior::Refuse => Err(TransportError::Connect {
                    agent,
                    message: "connection refused".to_string(),
                }),
                Behavior::Stall => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(json!({ "success": true, "result": {} }))
                }
                Behavior::Status(status, message) => Err(TransportError::Status {
                    agent,
                    status: *status,
                    message: message.to_string(),
                }),
            }
        }

        async fn health(&self, agent: AgentKind) -> Result<Value, TransportError> {
            match &self.0 {
                Behavior::Refuse => Err(TransportError::Connect {
                    agent,
                    message: "connection refused".to_string(),
                }),
                _ => Ok(json!({ "status": "healthy", "service": agent.name() })),
            }
        }
    }

    fn client(behavior: Behavior) -> AgentClient {
        AgentClient::new(
            Arc::new(StubTransport(behavior)),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn unknown_agent_fails_fast() {
        let client = client(Behavior::Refuse);
        let err = client
            .call("credit_bureau", &json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.0, "credit_bureau");
    }

    #[tokio::test]
    async fn success_envelope_yields_result() {
        let client = client(Behavior::Respond(json!({
            "success": true,
            "service": "scoring",
            "result": { "credit_score": 780, "credit_rating": "excellent" }
        })));

        let result = client
            .call_typed::<ScoreResult>(AgentKind::Scoring, &json!({}))
            .await;
        assert_eq!(result.status(), StageStatus::Ok);
        assert_eq!(result.value().map(|score| score.credit_score), Some(780));
    }

    #[tokio::test]
    async fn connection_failure_uses_agent_fallback() {
        let client = client(Behavior::Refuse);
        let result = client
            .call_typed::<FraudVerdict>(AgentKind::FraudDetector, &json!({}))
            .await;

        match result {
            StageResult::Unavailable(verdict) => {
                assert!(!verdict.is_fraud);
                assert_eq!(verdict.fraud_probability, 0.1);
                assert_eq!(verdict.risk_level, "low");
            }
            other => panic!("expected fallback verdict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_not_defaulted() {
        let client = client(Behavior::Stall);
        let result = client.call_agent(AgentKind::Scoring, &json!({})).await;
        assert_eq!(result, StageResult::Failed(StageFailure::Timeout { millis: 50 }));
    }

    #[tokio::test]
    async fn error_status_is_reported_as_failure() {
        let client = client(Behavior::Status(500, "model crashed"));
        let result = client.call_agent(AgentKind::Scoring, &json!({})).await;
        assert_eq!(
            result,
            StageResult::Failed(StageFailure::AgentError {
                status: Some(500),
                message: "model crashed".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn unsuccessful_envelope_is_reported_as_failure() {
        let client = client(Behavior::Respond(json!({
            "success": false,
            "error": "No data provided"
        })));
        let result = client.call_agent(AgentKind::FeatureExtractor, &json!({})).await;
        assert!(matches!(
            result,
            StageResult::Failed(StageFailure::AgentError { status: None, .. })
        ));
    }

    #[tokio::test]
    async fn invalid_typed_result_is_malformed() {
        let client = client(Behavior::Respond(json!({
            "success": true,
            "result": { "credit_score": 12 }
        })));
        let result = client
            .call_typed::<ScoreResult>(AgentKind::Scoring, &json!({}))
            .await;
        assert!(matches!(
            result,
            StageResult::Failed(StageFailure::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn health_all_reports_every_agent() {
        let client = client(Behavior::Refuse);
        let report = client.health_all().await;
        assert_eq!(report.len(), AgentKind::ALL.len());
        assert!(report.iter().all(|entry| !entry.reachable));
    }
}
