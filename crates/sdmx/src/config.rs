//! Configuration files.

use sdmx_cache::{FileCache, InMemoryCache, NoopCache};
use sdmx_core::{Languages, Result, SdmxCache, SdmxError};
use sdmx_web::WebSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Name of the database of the SQLite store inside the cache directory.
#[cfg(feature = "sqlite")]
const SQLITE_FILE: &str = "sdmx-cache.db";

/// Kind of cache store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    /// Process-wide in-memory store.
    #[default]
    Memory,
    /// One file per entry.
    File,
    /// SQLite database.
    Sqlite,
    /// No caching.
    None,
}

fn default_ttl() -> u64 {
    sdmx_cache::DEFAULT_TTL.as_secs()
}

/// Cache store settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store to use.
    #[serde(default)]
    pub kind: CacheKind,
    /// Directory of the file and SQLite stores; defaults to `sdmx` under the
    /// system temporary directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Time-to-live of entries of REST sources, in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    /// Gzip entries of the file store.
    #[serde(default)]
    pub compress: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: CacheKind::default(),
            directory: None,
            ttl: default_ttl(),
            compress: false,
        }
    }
}

impl CacheConfig {
    /// Returns the time-to-live.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("sdmx"))
    }

    /// Creates the configured store.
    ///
    /// # Errors
    /// Fails if the SQLite database cannot be opened, or if SQLite is asked
    /// for without the `sqlite` feature.
    pub fn build(&self) -> Result<Arc<dyn SdmxCache>> {
        Ok(match self.kind {
            CacheKind::Memory => Arc::new(InMemoryCache::new()),
            CacheKind::None => Arc::new(NoopCache::new()),
            CacheKind::File => {
                Arc::new(FileCache::new(self.directory()).with_compression(self.compress))
            }
            CacheKind::Sqlite => self.build_sqlite()?,
        })
    }

    #[cfg(feature = "sqlite")]
    fn build_sqlite(&self) -> Result<Arc<dyn SdmxCache>> {
        let directory = self.directory();
        std::fs::create_dir_all(&directory)?;
        Ok(Arc::new(sdmx_cache::SqliteCache::new(
            directory.join(SQLITE_FILE),
        )?))
    }

    #[cfg(not(feature = "sqlite"))]
    fn build_sqlite(&self) -> Result<Arc<dyn SdmxCache>> {
        Err(SdmxError::NotSupported(
            "SQLite cache requires the 'sqlite' feature".to_string(),
        ))
    }
}

/// Settings of an [`SdmxRegistry`](crate::SdmxRegistry).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdmxConfig {
    /// Default language priority, used by sources that do not set their own.
    #[serde(default)]
    pub languages: Languages,
    /// Cache store.
    #[serde(default)]
    pub cache: CacheConfig,
    /// REST sources.
    #[serde(default)]
    pub sources: Vec<WebSource>,
}

impl SdmxConfig {
    /// Reads a JSON configuration file.
    ///
    /// # Errors
    /// Returns [`SdmxError::Io`] if the file cannot be read and
    /// [`SdmxError::Parse`] if it is not a valid configuration.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| SdmxError::Parse(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config: SdmxConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SdmxConfig::default());
        assert_eq!(config.cache.kind, CacheKind::Memory);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sdmx.json");
        std::fs::write(
            &path,
            r#"{
                "languages": "en",
                "cache": {"kind": "file", "directory": "/var/cache/sdmx", "ttl": 60, "compress": true},
                "sources": [{"id": "ECB", "endpoint": "https://data-api.ecb.europa.eu/service"}]
            }"#,
        )
        .unwrap();

        let config = SdmxConfig::from_json_file(&path).unwrap();
        assert_eq!(config.languages, Languages::new("en"));
        assert_eq!(config.cache.kind, CacheKind::File);
        assert_eq!(config.cache.directory(), PathBuf::from("/var/cache/sdmx"));
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert!(config.cache.compress);
        assert_eq!(config.sources[0].id, "ECB");
    }

    #[test]
    fn test_from_json_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            SdmxConfig::from_json_file(dir.path().join("missing.json")),
            Err(SdmxError::Io(_))
        ));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"cache": {"kind": "redis"}}"#).unwrap();
        assert!(matches!(
            SdmxConfig::from_json_file(&path),
            Err(SdmxError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_build_stores() {
        let dir = TempDir::new().unwrap();
        let mut config = CacheConfig {
            directory: Some(dir.path().to_path_buf()),
            ..CacheConfig::default()
        };
        for kind in [CacheKind::Memory, CacheKind::File, CacheKind::None] {
            config.kind = kind;
            let cache = config.build().unwrap();
            assert!(cache.get("missing").await.unwrap().is_none());
        }

        config.kind = CacheKind::Sqlite;
        #[cfg(feature = "sqlite")]
        {
            config.build().unwrap();
            assert!(dir.path().join(SQLITE_FILE).exists());
        }
        #[cfg(not(feature = "sqlite"))]
        assert!(matches!(config.build(), Err(SdmxError::NotSupported(_))));
    }
}
