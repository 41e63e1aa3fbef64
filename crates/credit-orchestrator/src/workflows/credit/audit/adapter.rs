use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use super::cache::{AuditCache, AuditQuery, CacheStatus, CachedAuditRecord};
use super::record::AuditRecord;
use super::sink::DurableSink;

/// Where an audit record ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditWriteOutcome {
    Written,
    Cached,
}

impl AuditWriteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AuditWriteOutcome::Written => "written",
            AuditWriteOutcome::Cached => "cached",
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub synced: usize,
    pub remaining: usize,
    /// Record ids that stayed cached because the sink refused them.
    pub failed: Vec<String>,
}

/// Best-effort audit writer backed by a bounded local cache.
pub struct AuditSinkAdapter {
    sink: Arc<dyn DurableSink>,
    cache: AuditCache,
    reconcile_gate: AsyncMutex<()>,
}

impl AuditSinkAdapter {
    pub fn new(sink: Arc<dyn DurableSink>, capacity: usize) -> Self {
        Self {
            sink,
            cache: AuditCache::new(capacity),
            reconcile_gate: AsyncMutex::new(()),
        }
    }

    pub fn cache(&self) -> &AuditCache {
        &self.cache
    }

    /// Writes `record` durably, falling back to the cache. Never fails.
    pub async fn record(&self, record: AuditRecord) -> AuditWriteOutcome {
        match self.sink.append(&record).await {
            Ok(receipt) => {
                info!(
                    record_id = %receipt.record_id,
                    record_type = record.record_type.label(),
                    duplicate = receipt.duplicate,
                    "audit record written"
                );
                AuditWriteOutcome::Written
            }
            Err(err) => {
                let record_id = record.record_id.clone();
                let push = self.cache.push(record);
                warn!(
                    %record_id,
                    cache_id = %push.cache_id,
                    cache_size = push.size,
                    error = %err,
                    "audit sink unavailable, record cached"
                );
                if let Some(evicted) = push.evicted {
                    warn!(
                        record_id = %evicted.record.record_id,
                        cache_id = %evicted.cache_id,
                        "audit cache full, dropped oldest record"
                    );
                }
                AuditWriteOutcome::Cached
            }
        }
    }

    /// Retries every cached record in order and drops the ones the sink accepted.
    ///
    /// The cache lock is not held across sink writes, so records cached
    /// while a pass runs are kept for the next one.
    pub async fn reconcile(&self) -> ReconcileReport {
        let _pass = self.reconcile_gate.lock().await;
        let pending: Vec<CachedAuditRecord> = self.cache.snapshot();
        if pending.is_empty() {
            return ReconcileReport::default();
        }

        let mut synced = HashSet::new();
        let mut failed = Vec::new();
        for entry in &pending {
            match self.sink.append(&entry.record).await {
                Ok(_) => {
                    synced.insert(entry.cache_id.clone());
                }
                Err(err) => {
                    warn!(
                        record_id = %entry.record.record_id,
                        error = %err,
                        "audit record still pending"
                    );
                    failed.push(entry.record.record_id.clone());
                }
            }
        }

        self.cache.remove(&synced);
        let report = ReconcileReport {
            synced: synced.len(),
            remaining: self.cache.len(),
            failed,
        };
        info!(
            synced = report.synced,
            remaining = report.remaining,
            "audit cache reconciled"
        );
        report
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.cache.status()
    }

    pub fn query(&self, filter: &AuditQuery) -> Vec<CachedAuditRecord> {
        self.cache.query(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::credit::audit::record::AuditRecordType;
    use crate::workflows::credit::audit::sink::{InMemoryLedger, SinkError, SinkReceipt};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    fn decision_record(seq: usize) -> AuditRecord {
        AuditRecord::new(
            AuditRecordType::LoanDecision,
            "A-1",
            &json!({ "decision": "approved", "seq": seq }),
        )
    }

    #[tokio::test]
    async fn writes_through_when_sink_is_available() {
        let ledger = Arc::new(InMemoryLedger::new());
        let adapter = AuditSinkAdapter::new(ledger.clone(), 10);

        let outcome = adapter.record(decision_record(0)).await;

        assert_eq!(outcome, AuditWriteOutcome::Written);
        assert_eq!(ledger.len(), 1);
        assert!(adapter.cache().is_empty());
    }

    #[tokio::test]
    async fn caches_when_sink_is_unavailable() {
        let ledger = Arc::new(InMemoryLedger::unavailable());
        let adapter = AuditSinkAdapter::new(ledger.clone(), 10);

        let outcome = adapter.record(decision_record(0)).await;

        assert_eq!(outcome, AuditWriteOutcome::Cached);
        assert_eq!(adapter.cache_status().size, 1);
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn reconcile_twice_does_not_duplicate_writes() {
        let ledger = Arc::new(InMemoryLedger::unavailable());
        let adapter = AuditSinkAdapter::new(ledger.clone(), 10);
        for seq in 0..3 {
            adapter.record(decision_record(seq)).await;
        }

        ledger.set_available(true);
        let first = adapter.reconcile().await;
        let second = adapter.reconcile().await;

        assert_eq!(first.synced, 3);
        assert_eq!(first.remaining, 0);
        assert_eq!(second, ReconcileReport::default());
        assert_eq!(ledger.len(), 3);
    }

    #[tokio::test]
    async fn failed_reconcile_keeps_order() {
        let ledger = Arc::new(InMemoryLedger::unavailable());
        let adapter = AuditSinkAdapter::new(ledger.clone(), 10);
        let mut ids = Vec::new();
        for seq in 0..3 {
            let record = decision_record(seq);
            ids.push(record.record_id.clone());
            adapter.record(record).await;
        }

        let report = adapter.reconcile().await;

        assert_eq!(report.synced, 0);
        assert_eq!(report.remaining, 3);
        assert_eq!(report.failed, ids);
        let cached: Vec<String> = adapter
            .cache()
            .snapshot()
            .into_iter()
            .map(|entry| entry.record.record_id)
            .collect();
        assert_eq!(cached, ids);
    }

    struct GatedSink {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DurableSink for GatedSink {
        async fn append(&self, record: &AuditRecord) -> Result<SinkReceipt, SinkError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(SinkReceipt {
                record_id: record.record_id.clone(),
                transaction_id: None,
                duplicate: false,
            })
        }
    }

    #[tokio::test]
    async fn records_cached_during_reconcile_are_kept() {
        let sink = Arc::new(GatedSink {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let adapter = Arc::new(AuditSinkAdapter::new(sink.clone(), 10));
        adapter.cache().push(decision_record(0));

        let pass = tokio::spawn({
            let adapter = Arc::clone(&adapter);
            async move { adapter.reconcile().await }
        });

        sink.entered.notified().await;
        let late = decision_record(1);
        let late_id = late.record_id.clone();
        adapter.cache().push(late);
        sink.release.notify_one();

        let report = pass.await.expect("reconcile task");
        assert_eq!(report.synced, 1);
        assert_eq!(report.remaining, 1);
        let cached = adapter.cache().snapshot();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].record.record_id, late_id);
    }

    #[tokio::test]
    async fn query_filters_cached_records() {
        let adapter = AuditSinkAdapter::new(Arc::new(InMemoryLedger::unavailable()), 10);
        adapter.record(decision_record(0)).await;
        adapter
            .record(AuditRecord::new(
                AuditRecordType::FraudDetection,
                "A-2",
                &json!({ "is_fraud": true, "fraud_probability": 0.9 }),
            ))
            .await;

        let filter = AuditQuery {
            applicant_id: Some("A-2".to_string()),
            ..AuditQuery::default()
        };
        let matches = adapter.query(&filter);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.record_type, AuditRecordType::FraudDetection);
    }
}
