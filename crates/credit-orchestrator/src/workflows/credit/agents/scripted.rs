use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::registry::AgentKind;
use super::transport::{AgentTransport, TransportError};

/// Canned behaviour for one agent.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Answers `{success: true, result}`.
    Result(Value),
    /// Answers with the given body verbatim.
    Body(Value),
    Refuse,
    Stall(Duration),
    Status(u16, String),
}

/// In-process transport that answers from a script and records every call.
///
/// Agents without a script refuse connections.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<AgentKind, ScriptedReply>>,
    calls: Mutex<Vec<(AgentKind, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, agent: AgentKind, reply: ScriptedReply) -> Self {
        self.set(agent, reply);
        self
    }

    pub fn set(&self, agent: AgentKind, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(agent, reply);
    }

    /// Payloads sent to `agent`, oldest first.
    pub fn payloads_for(&self, agent: AgentKind) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(called, _)| *called == agent)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn calls_to(&self, agent: AgentKind) -> usize {
        self.payloads_for(agent).len()
    }

    fn reply(&self, agent: AgentKind) -> ScriptedReply {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&agent)
            .cloned()
            .unwrap_or(ScriptedReply::Refuse)
    }
}

#[async_trait]
impl AgentTransport for ScriptedTransport {
    async fn post_process(&self, agent: AgentKind, payload: &Value) -> Result<Value, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((agent, payload.clone()));

        match self.reply(agent) {
            ScriptedReply::Result(result) => Ok(json!({
                "success": true,
                "service": agent.name(),
                "result": result,
            })),
            ScriptedReply::Body(body) => Ok(body),
            ScriptedReply::Refuse => Err(TransportError::Connect {
                agent,
                message: "connection refused".to_string(),
            }),
            ScriptedReply::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Err(TransportError::Timeout { agent })
            }
            ScriptedReply::Status(status, message) => Err(TransportError::Status {
                agent,
                status,
                message,
            }),
        }
    }

    async fn health(&self, agent: AgentKind) -> Result<Value, TransportError> {
        match self.reply(agent) {
            ScriptedReply::Refuse => Err(TransportError::Connect {
                agent,
                message: "connection refused".to_string(),
            }),
            ScriptedReply::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Err(TransportError::Timeout { agent })
            }
            _ => Ok(json!({ "status": "healthy", "service": agent.name() })),
        }
    }
}
