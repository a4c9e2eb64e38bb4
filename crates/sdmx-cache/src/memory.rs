//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdmx_core::{
    Clock, DataRepository, Result, SdmxCache, SystemClock,
    clock::{expiry_of, is_expired},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Cache entry with its expiry instant.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: DataRepository,
    expires_at: DateTime<Utc>,
}

/// Process-wide in-memory cache.
///
/// Entries are stored in a `RwLock`-protected `HashMap` and are lost when the
/// cache is dropped. Repositories are cloned on get/put operations. An expired
/// entry is removed from the map by the read that discovers it.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self {
            entries: RwLock::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl InMemoryCache {
    /// Create a new empty in-memory cache on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another clock to compute expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Number of entries held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if no entry is held.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SdmxCache for InMemoryCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<DataRepository>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => {
                    debug!("Cache miss");
                    return Ok(None);
                }
                Some(entry) if !is_expired(now, entry.expires_at) => {
                    debug!("Cache hit");
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
            }
        }

        // The entry may have been replaced between the two locks.
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if !is_expired(now, entry.expires_at) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                debug!("Evicted expired entry");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, value), fields(repository = %value.name()))]
    async fn put(&self, key: &str, value: DataRepository, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            value,
            expires_at: expiry_of(self.clock.now(), ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        debug!("Cached entry");
        Ok(())
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !is_expired(now, entry.expires_at));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}
