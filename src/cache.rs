//! Process-wide result cache for the report entry points.
//!
//! Entries are keyed by operation name plus the ordered call arguments.
//! There is no stampede guard: two concurrent misses on the same key both
//! run the query and the later one wins the slot.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::config::CacheConfig;
use crate::report::ReportOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: &'static str,
    args: Vec<String>,
}

impl CacheKey {
    pub fn new<I, S>(operation: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operation,
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

struct CacheEntry {
    outcome: ReportOutcome,
    stored_at: Instant,
    seq: u64,
}

pub struct QueryCache {
    entries: DashMap<CacheKey, CacheEntry>,
    next_seq: AtomicU64,
    ttl: Option<Duration>,
    capacity: Option<usize>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl QueryCache {
    /// Keep every entry forever.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn new(ttl: Option<Duration>, capacity: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
            ttl,
            capacity,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl_secs.map(Duration::from_secs), config.capacity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Cached outcome for `key`, dropping it first if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<ReportOutcome> {
        let stale_seq = {
            let entry = self.entries.get(key)?;
            if self.is_fresh(&entry) {
                return Some(entry.outcome.clone());
            }
            entry.seq
        };
        debug!(operation = key.operation, "cache entry expired");
        self.remove_stale(key, stale_seq);
        None
    }

    /// Store `outcome` unless it is a failure.
    pub fn insert(&self, key: CacheKey, outcome: ReportOutcome) {
        if outcome.is_failed() {
            return;
        }
        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return;
            }
            while self.entries.len() >= capacity && !self.entries.contains_key(&key) {
                self.evict_oldest();
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                outcome,
                stored_at: Instant::now(),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
    }

    /// Return the cached outcome for `key` or run `compute` and store its result.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> ReportOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ReportOutcome>,
    {
        if let Some(outcome) = self.get(&key) {
            debug!(operation = key.operation, "cache hit");
            return outcome;
        }
        let outcome = compute().await;
        self.insert(key, outcome.clone());
        outcome
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.ttl.map_or(true, |ttl| entry.stored_at.elapsed() < ttl)
    }

    /// Drop the entry under `key` only if it is still the one stored as `seq`.
    /// An insert that raced in after the expiry check keeps its slot.
    fn remove_stale(&self, key: &CacheKey, seq: u64) -> bool {
        self.entries.remove_if(key, |_, entry| entry.seq == seq).is_some()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().seq)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            debug!(operation = key.operation, "evicting cache entry");
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::models::Table;

    fn key(start: &str) -> CacheKey {
        CacheKey::new("load_patient_data", [start, "2024-01-31"])
    }

    fn data() -> ReportOutcome {
        ReportOutcome::from_table(Table::from_rows(&["x"], vec![vec![1_i64.into()]]))
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let cache = QueryCache::unbounded();
        let calls = &AtomicUsize::new(0);
        for _ in 0..2 {
            let outcome = cache
                .get_or_compute(key("2024-01-01"), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    data()
                })
                .await;
            assert!(outcome.table().is_some());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_stored() {
        let cache = QueryCache::unbounded();
        let calls = &AtomicUsize::new(0);
        for _ in 0..2 {
            cache
                .get_or_compute(key("2024-01-01"), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    ReportOutcome::Failed("database connection failed".into())
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn arguments_and_operation_both_distinguish_keys() {
        assert_ne!(key("2024-01-01"), key("2024-01-02"));
        assert_ne!(
            CacheKey::new("load_patient_data", ["a", "b"]),
            CacheKey::new("load_service_logs", ["a", "b"])
        );
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = QueryCache::new(Some(Duration::ZERO), None);
        cache.insert(key("2024-01-01"), data());
        assert!(cache.get(&key("2024-01-01")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn expiry_does_not_drop_a_newer_entry() {
        let cache = QueryCache::unbounded();
        cache.insert(key("2024-01-01"), data());
        let expired_seq = cache.entries.get(&key("2024-01-01")).unwrap().seq;
        cache.insert(key("2024-01-01"), ReportOutcome::Empty);

        assert!(!cache.remove_stale(&key("2024-01-01"), expired_seq));
        assert_eq!(cache.get(&key("2024-01-01")), Some(ReportOutcome::Empty));
    }

    #[test]
    fn expired_entry_is_removed_by_its_sequence() {
        let cache = QueryCache::unbounded();
        cache.insert(key("2024-01-01"), data());
        let seq = cache.entries.get(&key("2024-01-01")).unwrap().seq;

        assert!(cache.remove_stale(&key("2024-01-01"), seq));
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_the_oldest_entry() {
        let cache = QueryCache::new(None, Some(2));
        cache.insert(key("2024-01-01"), data());
        cache.insert(key("2024-01-02"), ReportOutcome::Empty);
        cache.insert(key("2024-01-03"), data());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key("2024-01-01")).is_none());
        assert!(cache.get(&key("2024-01-03")).is_some());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = QueryCache::unbounded();
        cache.insert(key("2024-01-01"), ReportOutcome::Empty);
        cache.clear();
        assert!(cache.is_empty());
    }
}
