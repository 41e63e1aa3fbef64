use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::{AuditRecord, AuditRecordType};

pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Audit record waiting for a durable write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAuditRecord {
    pub cache_id: String,
    pub cached_at: DateTime<Utc>,
    pub record: AuditRecord,
}

/// Result of appending to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachePush {
    pub cache_id: String,
    pub size: usize,
    pub evicted: Option<CachedAuditRecord>,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub size: usize,
    pub capacity: usize,
    pub evicted_total: u64,
    pub oldest_cached: Option<DateTime<Utc>>,
    pub newest_cached: Option<DateTime<Utc>>,
}

/// Filter over cached records. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub applicant_id: Option<String>,
    #[serde(default)]
    pub record_type: Option<AuditRecordType>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl AuditQuery {
    fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(applicant_id) = &self.applicant_id {
            if &record.applicant_id != applicant_id {
                return false;
            }
        }
        if let Some(record_type) = self.record_type {
            if record.record_type != record_type {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.timestamp > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: VecDeque<CachedAuditRecord>,
    next_sequence: u64,
    evicted_total: u64,
}

/// Bounded FIFO of unsynced audit records.
///
/// A single lock covers append and eviction. When full, the oldest entry is
/// dropped to admit the newest.
#[derive(Debug)]
pub struct AuditCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl AuditCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn push(&self, record: AuditRecord) -> CachePush {
        let mut state = self.lock();
        let cache_id = format!("cache_{}", state.next_sequence);
        state.next_sequence += 1;

        let evicted = if state.entries.len() >= self.capacity {
            state.evicted_total += 1;
            state.entries.pop_front()
        } else {
            None
        };

        state.entries.push_back(CachedAuditRecord {
            cache_id: cache_id.clone(),
            cached_at: Utc::now(),
            record,
        });

        CachePush {
            cache_id,
            size: state.entries.len(),
            evicted,
        }
    }

    /// Copy of every entry, oldest first.
    pub fn snapshot(&self) -> Vec<CachedAuditRecord> {
        self.lock().entries.iter().cloned().collect()
    }

    /// Removes the entries with the given cache ids, keeping the order of the rest.
    pub fn remove(&self, cache_ids: &HashSet<String>) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|entry| !cache_ids.contains(&entry.cache_id));
        before - state.entries.len()
    }

    pub fn query(&self, filter: &AuditQuery) -> Vec<CachedAuditRecord> {
        self.lock()
            .entries
            .iter()
            .filter(|entry| filter.matches(&entry.record))
            .cloned()
            .collect()
    }

    pub fn status(&self) -> CacheStatus {
        let state = self.lock();
        CacheStatus {
            size: state.entries.len(),
            capacity: self.capacity,
            evicted_total: state.evicted_total,
            oldest_cached: state.entries.front().map(|entry| entry.cached_at),
            newest_cached: state.entries.back().map(|entry| entry.cached_at),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Entries are plain data; a panic mid-push cannot leave them inconsistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AuditCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
