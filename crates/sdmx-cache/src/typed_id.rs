//! Typed cache keys.
//!
//! A [`TypedId`] pairs a cache key with the two functions converting between
//! a typed value and the [`DataRepository`] a store holds. Keys are
//! URI-shaped, `scheme:category/segment/segment/...`, every segment being
//! percent-encoded so that a discriminator can never forge a separator.

use sdmx_core::{DataRepository, Result, SdmxCache};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tracing::{debug, warn};
use url::form_urlencoded;

/// Percent-encodes one key segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    // A literal '+' comes out as %2B, so every remaining '+' is a space.
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// A cache key bound to the type it stores.
pub struct TypedId<T> {
    key: String,
    loader: fn(DataRepository) -> Option<T>,
    storer: fn(&T) -> DataRepository,
}

impl<T> TypedId<T> {
    /// Creates an id under a base key such as `cache:rest`.
    #[must_use]
    pub fn new(
        base: impl Into<String>,
        loader: fn(DataRepository) -> Option<T>,
        storer: fn(&T) -> DataRepository,
    ) -> Self {
        Self {
            key: base.into(),
            loader,
            storer,
        }
    }

    /// Returns a child id with one more encoded segment.
    #[must_use]
    pub fn with(&self, segment: impl AsRef<str>) -> Self {
        Self {
            key: format!("{}/{}", self.key, encode_segment(segment.as_ref())),
            loader: self.loader,
            storer: self.storer,
        }
    }

    /// Returns the resolved cache key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the live cached value, if any.
    ///
    /// Store failures are logged and reported as a miss; this never fetches.
    pub async fn peek(&self, cache: &dyn SdmxCache) -> Option<T> {
        match cache.get(&self.key).await {
            Ok(Some(repository)) => (self.loader)(repository),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Returns the cached value or computes, stores and returns a fresh one.
    ///
    /// # Errors
    /// Propagates the failure of `factory`; nothing is stored in that case.
    pub async fn load<F, Fut>(
        &self,
        cache: &dyn SdmxCache,
        factory: F,
        ttl: impl Fn(&T) -> Duration,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.load_if(cache, factory, ttl, |_| true).await
    }

    /// Like [`TypedId::load`], but a cached value rejected by `validator` is
    /// treated as a miss and replaced.
    ///
    /// # Errors
    /// Propagates the failure of `factory`; nothing is stored in that case.
    pub async fn load_if<F, Fut>(
        &self,
        cache: &dyn SdmxCache,
        factory: F,
        ttl: impl Fn(&T) -> Duration,
        validator: impl Fn(&T) -> bool,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.peek(cache).await {
            if validator(&value) {
                debug!(key = %self.key, "Serving from cache");
                return Ok(value);
            }
            debug!(key = %self.key, "Cached value does not cover the request");
        }

        let value = factory().await?;
        if let Err(e) = cache
            .put(&self.key, (self.storer)(&value), ttl(&value))
            .await
        {
            warn!(key = %self.key, error = %e, "Failed to cache value");
        }
        Ok(value)
    }
}

impl<T> Clone for TypedId<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            loader: self.loader,
            storer: self.storer,
        }
    }
}

impl<T> PartialEq for TypedId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for TypedId<T> {}

impl<T> Hash for TypedId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> fmt::Debug for TypedId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedId").field(&self.key).finish()
    }
}

impl<T> fmt::Display for TypedId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
