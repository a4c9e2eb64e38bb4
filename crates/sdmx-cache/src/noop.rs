//! No-op cache implementation.

use async_trait::async_trait;
use sdmx_core::{Clock, DataRepository, Result, SdmxCache, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get` always returns `Ok(None)` and `put` always returns `Ok(())`, so a
/// cached client over it fetches from its source on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SdmxCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<DataRepository>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _key: &str, _value: DataRepository, _ttl: Duration) -> Result<()> {
        trace!("NoopCache: put called, doing nothing");
        Ok(())
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::new(SystemClock)
    }

    async fn purge_expired(&self) -> Result<usize> {
        trace!("NoopCache: purge_expired called, returning 0");
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopCache: clear called, doing nothing");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_cache_never_hits() {
        let cache = NoopCache::new();
        cache
            .put("k", DataRepository::new("x"), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_cache_management() {
        let cache = NoopCache::new();
        assert_eq!(cache.purge_expired().await.unwrap(), 0);
        assert!(cache.clear().await.is_ok());
    }
}
