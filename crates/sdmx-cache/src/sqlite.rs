//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, params};
use sdmx_core::{
    Clock, DataRepository, Result, SdmxCache, SdmxError, SystemClock,
    clock::{expiry_of, is_expired},
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, instrument};

fn cache_error(e: impl std::fmt::Display) -> SdmxError {
    SdmxError::Cache(e.to_string())
}

/// SQLite-based cache of repositories.
///
/// This cache stores entries in a SQLite database file, providing persistence
/// across application restarts. Payloads are stored as JSON next to their
/// expiry instant in milliseconds since the epoch.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(cache_error)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(cache_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let cache = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Use another clock to compute expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(cache_error)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sdmx_cache (
                key TEXT PRIMARY KEY NOT NULL,
                payload TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
            [],
        )
        .map_err(cache_error)?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sdmx_cache_expires_at ON sdmx_cache(expires_at)",
            [],
        )
        .map_err(cache_error)?;
        debug!("SQLite cache schema initialized");
        Ok(())
    }
}

#[async_trait]
impl SdmxCache for SqliteCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<DataRepository>> {
        let now = self.clock.now();
        let conn = self.conn.lock().map_err(cache_error)?;
        let row = conn
            .query_row(
                "SELECT payload, expires_at FROM sdmx_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .map_err(cache_error)?;

        let Some((payload, expires_at)) = row else {
            debug!("Cache miss");
            return Ok(None);
        };
        let expires_at = DateTime::from_timestamp_millis(expires_at)
            .ok_or_else(|| SdmxError::Cache(format!("Invalid expiry {expires_at}")))?;
        if is_expired(now, expires_at) {
            conn.execute("DELETE FROM sdmx_cache WHERE key = ?1", params![key])
                .map_err(cache_error)?;
            debug!("Evicted expired entry");
            return Ok(None);
        }

        let repository: DataRepository =
            serde_json::from_str(&payload).map_err(|e| SdmxError::Parse(e.to_string()))?;
        debug!("Cache hit");
        Ok(Some(repository))
    }

    #[instrument(skip(self, value), fields(repository = %value.name()))]
    async fn put(&self, key: &str, value: DataRepository, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(&value).map_err(|e| SdmxError::Parse(e.to_string()))?;
        let expires_at = expiry_of(self.clock.now(), ttl).timestamp_millis();
        let conn = self.conn.lock().map_err(cache_error)?;
        conn.execute(
            "INSERT OR REPLACE INTO sdmx_cache (key, payload, expires_at) VALUES (?1, ?2, ?3)",
            params![key, payload, expires_at],
        )
        .map_err(cache_error)?;
        debug!("Cached entry");
        Ok(())
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now().timestamp_millis();
        let conn = self.conn.lock().map_err(cache_error)?;
        let removed = conn
            .execute("DELETE FROM sdmx_cache WHERE expires_at <= ?1", params![now])
            .map_err(cache_error)?;
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(cache_error)?;
        conn.execute("DELETE FROM sdmx_cache", [])
            .map_err(cache_error)?;
        debug!("Cleared all cache entries");
        Ok(())
    }
}
