//! TTL-bounded in-memory dataset cache.
//!
//! Entries are keyed by city and ingestion scope, so a borough-scoped
//! dataset is never served for a city-wide query or the reverse. Datasets
//! are immutable once built and replaced whole, so readers holding an
//! [`Arc<Dataset>`] never see a partially refreshed state.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use civic_safety_geo::filter::IndexedRecords;

/// Identifies one cached dataset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheKey {
    /// City id.
    pub city: String,
    /// Canonical area the dataset was restricted to, or `None` for the
    /// whole city.
    pub scope: Option<String>,
}

impl CacheKey {
    /// Creates a key.
    #[must_use]
    pub fn new(city: &str, scope: Option<&str>) -> Self {
        Self {
            city: city.to_string(),
            scope: scope.map(str::to_string),
        }
    }
}

/// One ingested, categorized, and indexed dataset.
#[derive(Debug)]
pub struct Dataset {
    /// Records with their lookup indices.
    pub records: IndexedRecords,
    /// When ingestion finished.
    pub fetched_at: DateTime<Utc>,
    /// Ids of feeds that failed during ingestion.
    pub failed_sources: Vec<String>,
}

/// Holds the most recent dataset per [`CacheKey`].
#[derive(Debug)]
pub struct DatasetCache {
    ttl: Duration,
    entries: RwLock<BTreeMap<CacheKey, Arc<Dataset>>>,
}

impl DatasetCache {
    /// Creates an empty cache whose entries expire after `ttl`.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the entry for `key` if it is younger than the TTL at `now`.
    #[must_use]
    pub fn get_fresh(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Arc<Dataset>> {
        let entry = self.get_any(key)?;
        if now - entry.fetched_at < self.ttl {
            log::debug!("Cache hit for {key:?}");
            Some(entry)
        } else {
            log::debug!("Cache entry for {key:?} expired");
            None
        }
    }

    /// Returns the entry for `key` regardless of age.
    #[must_use]
    pub fn get_any(&self, key: &CacheKey) -> Option<Arc<Dataset>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores `dataset` under `key`, replacing any previous entry.
    pub fn put(&self, key: CacheKey, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&dataset));
        dataset
    }

    /// Drops the entry for `key`.
    pub fn invalidate(&self, key: &CacheKey) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Number of cached datasets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
