//! Cache store trait.
//!
//! This module defines the [`SdmxCache`] trait: a string-keyed store of
//! [`DataRepository`] payloads with per-entry time-to-live. Stores must be
//! safe to share between connections on different threads; concurrent
//! writes to the same key resolve as last-write-wins.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::{clock::Clock, error::Result, repository::DataRepository};

/// Store of cached repositories.
///
/// Implementations can keep entries in memory, on disk, in SQLite, etc.
#[async_trait]
pub trait SdmxCache: Send + Sync + Debug {
    /// Retrieves a live entry.
    ///
    /// Returns `Ok(Some(repo))` if a non-expired entry exists, `Ok(None)`
    /// otherwise. An expired entry found by this call is evicted.
    async fn get(&self, key: &str) -> Result<Option<DataRepository>>;

    /// Stores an entry expiring `ttl` after the current instant of
    /// [`SdmxCache::clock`], replacing any previous entry.
    async fn put(&self, key: &str, value: DataRepository, ttl: Duration) -> Result<()>;

    /// Returns the clock used to compute expiry.
    fn clock(&self) -> Arc<dyn Clock>;

    /// Removes every expired entry.
    ///
    /// Returns the number of entries removed.
    async fn purge_expired(&self) -> Result<usize>;

    /// Removes every entry.
    async fn clear(&self) -> Result<()>;
}
