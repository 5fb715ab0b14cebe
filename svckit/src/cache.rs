use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::FetchError;
use crate::types::Dataset;

#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pub data: Option<Arc<Dataset>>,
    pub fetched_at: Option<Instant>,
    pub last_error: Option<String>,
    pub failed_at: Option<Instant>,
    pub in_flight: bool,
}

impl CacheEntry {
    fn last_attempt(&self) -> Option<Instant> {
        match (self.fetched_at, self.failed_at) {
            (Some(ok), Some(failed)) => Some(ok.max(failed)),
            (ok, failed) => ok.or(failed),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryStatus {
    Loading,
    Ready { count: usize, stale: bool },
    Failed { error: String, last_count: Option<usize> },
}

/// Last known result per query key. A failed refresh never evicts data that
/// was already fetched; stale data keeps being served until a refresh lands.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: DashMap<String, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as being fetched. Returns false when a fetch is already in
    /// flight for it.
    pub fn begin_fetch(&self, key: &str) -> bool {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        if entry.in_flight {
            return false;
        }
        entry.in_flight = true;
        true
    }

    pub fn store_success(&self, key: &str, data: Dataset) {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        debug!("{}: cached {} items", key, data.count());
        entry.data = Some(Arc::new(data));
        entry.fetched_at = Some(Instant::now());
        entry.last_error = None;
        entry.failed_at = None;
        entry.in_flight = false;
    }

    pub fn store_failure(&self, key: &str, error: &FetchError) {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        entry.last_error = Some(error.to_string());
        entry.failed_at = Some(Instant::now());
        entry.in_flight = false;
    }

    pub fn snapshot(&self, key: &str) -> Option<Arc<Dataset>> {
        self.entries.get(key).and_then(|e| e.data.clone())
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    /// Due when never attempted, or when the last attempt is older than
    /// `interval` and nothing is in flight.
    pub fn is_due(&self, key: &str, interval: Duration) -> bool {
        match self.entries.get(key) {
            None => true,
            Some(entry) if entry.in_flight => false,
            Some(entry) => entry.last_attempt().map_or(true, |t| t.elapsed() >= interval),
        }
    }

    pub fn is_stale(&self, key: &str, stale_after: Duration) -> bool {
        self.entries
            .get(key)
            .and_then(|e| e.fetched_at)
            .map_or(true, |t| t.elapsed() >= stale_after)
    }

    pub fn status(&self, key: &str, stale_after: Duration) -> QueryStatus {
        let Some(entry) = self.entry(key) else {
            return QueryStatus::Loading;
        };

        match (&entry.data, &entry.last_error) {
            (_, Some(error)) if !entry.in_flight => QueryStatus::Failed {
                error: error.clone(),
                last_count: entry.data.as_ref().map(|d| d.count()),
            },
            (Some(data), _) => QueryStatus::Ready {
                count: data.count(),
                stale: entry.fetched_at.map_or(true, |t| t.elapsed() >= stale_after),
            },
            (None, _) => QueryStatus::Loading,
        }
    }

    /// Drops every key `keep` rejects, e.g. keys of a previous unit selection.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|key, _| keep(key));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
