use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::record::AuditRecord;
use crate::workflows::credit::agents::{AgentClient, AgentKind, LedgerReceipt, StageResult};

/// Failure to reach the store of record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("durable sink unavailable: {0}")]
    Unavailable(String),
}

/// Acknowledgement of a durable write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReceipt {
    pub record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// The sink already held this record id; nothing new was stored.
    pub duplicate: bool,
}

/// Append-only store of record. Appends must be idempotent per record id.
#[async_trait]
pub trait DurableSink: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<SinkReceipt, SinkError>;
}

/// Writes records through the ledger agent.
pub struct LedgerAgentSink {
    agents: Arc<AgentClient>,
}

impl LedgerAgentSink {
    pub fn new(agents: Arc<AgentClient>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl DurableSink for LedgerAgentSink {
    async fn append(&self, record: &AuditRecord) -> Result<SinkReceipt, SinkError> {
        let mut payload = serde_json::to_value(record)
            .map_err(|err| SinkError::Unavailable(format!("record not serializable: {err}")))?;
        if let Value::Object(map) = &mut payload {
            map.insert(
                "log_type".to_string(),
                Value::String(record.record_type.label().to_string()),
            );
        }

        match self
            .agents
            .call_typed::<LedgerReceipt>(AgentKind::BlockchainLogger, &payload)
            .await
        {
            // A cache acknowledgement means the agent's own chain is down.
            StageResult::Ok(receipt) if !receipt.is_durable() => {
                Err(SinkError::Unavailable(format!(
                    "{} only cached the record (storage: {})",
                    AgentKind::BlockchainLogger,
                    receipt.storage
                )))
            }
            StageResult::Ok(receipt) => Ok(SinkReceipt {
                record_id: record.record_id.clone(),
                transaction_id: receipt.transaction_id,
                duplicate: receipt.duplicate,
            }),
            // The agent's own fallback acknowledgement does not make the record durable.
            StageResult::Unavailable(_) => Err(SinkError::Unavailable(format!(
                "{} unreachable",
                AgentKind::BlockchainLogger
            ))),
            StageResult::Failed(failure) => Err(SinkError::Unavailable(failure.to_string())),
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    records: Vec<AuditRecord>,
    ids: HashSet<String>,
}

/// In-process ledger that dedupes by record id, with switchable availability.
#[derive(Debug)]
pub struct InMemoryLedger {
    available: AtomicBool,
    attempts: AtomicU64,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            attempts: AtomicU64::new(0),
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn unavailable() -> Self {
        let ledger = Self::new();
        ledger.set_available(false);
        ledger
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .clone()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append calls seen, including rejected and duplicate ones.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableSink for InMemoryLedger {
    async fn append(&self, record: &AuditRecord) -> Result<SinkReceipt, SinkError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if !self.available.load(Ordering::Acquire) {
            return Err(SinkError::Unavailable("ledger offline".to_string()));
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let duplicate = !state.ids.insert(record.record_id.clone());
        if !duplicate {
            state.records.push(record.clone());
        }

        Ok(SinkReceipt {
            record_id: record.record_id.clone(),
            transaction_id: Some(format!("tx_{}", record.record_id)),
            duplicate,
        })
    }
}
