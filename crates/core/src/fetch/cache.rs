use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Snapshot;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: String,
    credential: String,
}

impl CacheKey {
    pub fn new(source: impl Into<String>, credential: impl Into<String>) -> Self {
        Self { source: source.into(), credential: credential.into() }
    }
}

#[derive(Debug)]
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    fetched_at: DateTime<Utc>,
}

/// Time-expiring map from source/credential to the last exported snapshot.
///
/// Reads and writes are individually atomic; a miss followed by a fetch is not,
/// so two concurrent misses for one key both export and the later `put` wins.
#[derive(Debug)]
pub struct FetchCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the snapshot while it is younger than the ttl and its file still exists.
    /// Stale entries are dropped on the way out.
    pub fn get(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Arc<Snapshot>> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;

        let elapsed = now.signed_duration_since(entry.fetched_at).to_std().unwrap_or_default();
        if elapsed < self.ttl && entry.snapshot.path().exists() {
            return Some(Arc::clone(&entry.snapshot));
        }

        entries.remove(key);
        None
    }

    pub fn put(&self, key: CacheKey, snapshot: Arc<Snapshot>, now: DateTime<Utc>) {
        self.lock().insert(key, CacheEntry { snapshot, fetched_at: now });
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
