//! Client side of the agent boundary.
//!
//! Every scoring agent speaks the same envelope (`POST /process`, `GET /health`).
//! [`AgentClient`] turns each exchange into a [`StageResult`], substituting the
//! static fallback from [`fallback`] when an agent cannot be reached.

mod client;
pub mod fallback;
mod outcome;
pub mod payloads;
mod registry;
mod scripted;
mod transport;

pub use client::{AgentClient, AgentHealth};
pub use outcome::{StageFailure, StageResult, StageStatus};
pub use payloads::{
    AgentPayload, FeatureGroups, FeatureQuality, FeatureSet, FraudVerdict, Guidance,
    LedgerReceipt, RiskAssessment, ScoreResult,
};
pub use registry::{AgentKind, UnknownAgent};
pub use scripted::{ScriptedReply, ScriptedTransport};
pub use transport::{AgentTransport, HttpAgentTransport, TransportError};
