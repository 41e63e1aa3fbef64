use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed registry of agents the orchestrator may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    FeatureExtractor,
    FraudDetector,
    Scoring,
    RagCoach,
    BlockchainLogger,
}

impl AgentKind {
    pub const ALL: [AgentKind; 5] = [
        AgentKind::FeatureExtractor,
        AgentKind::FraudDetector,
        AgentKind::Scoring,
        AgentKind::RagCoach,
        AgentKind::BlockchainLogger,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::FeatureExtractor => "feature_extractor",
            AgentKind::FraudDetector => "fraud_detector",
            AgentKind::Scoring => "scoring",
            AgentKind::RagCoach => "rag_coach",
            AgentKind::BlockchainLogger => "blockchain_logger",
        }
    }

    /// Port the agent listens on when no URL is configured.
    pub fn default_port(&self) -> u16 {
        match self {
            AgentKind::FraudDetector => 5001,
            AgentKind::FeatureExtractor => 5002,
            AgentKind::Scoring => 5003,
            AgentKind::RagCoach => 5004,
            AgentKind::BlockchainLogger => 5005,
        }
    }

    /// Environment variable holding the agent's base URL.
    pub fn url_env_var(&self) -> &'static str {
        match self {
            AgentKind::FeatureExtractor => "FEATURE_EXTRACTOR_URL",
            AgentKind::FraudDetector => "FRAUD_DETECTOR_URL",
            AgentKind::Scoring => "SCORING_URL",
            AgentKind::RagCoach => "RAG_COACH_URL",
            AgentKind::BlockchainLogger => "BLOCKCHAIN_LOGGER_URL",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AgentKind {
    type Err = UnknownAgent;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        AgentKind::ALL
            .into_iter()
            .find(|agent| agent.name() == normalized)
            .ok_or_else(|| UnknownAgent(value.to_string()))
    }
}

/// Raised when a caller names an agent outside the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent type: {0}")]
pub struct UnknownAgent(pub String);
