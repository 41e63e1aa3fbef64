//! Append-only audit trail with a bounded local cache for sink outages.

mod adapter;
mod cache;
pub mod record;
mod sink;

pub use adapter::{AuditSinkAdapter, AuditWriteOutcome, ReconcileReport};
pub use cache::{AuditCache, AuditQuery, CacheStatus, CachedAuditRecord, DEFAULT_CACHE_CAPACITY};
pub use record::{AuditDetails, AuditRecord, AuditRecordType};
pub use sink::{DurableSink, InMemoryLedger, LedgerAgentSink, SinkError, SinkReceipt};
