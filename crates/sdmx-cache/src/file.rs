//! File-per-key cache implementation.
//!
//! Every entry lives in its own file under a root directory, named
//! `<prefix><sha256 of the key><suffix>`. The file holds the serializer's
//! encoding of a [`FileEntry`], optionally gzip-compressed. Entries survive
//! the process and can be shared by every process pointing at the same root.
//!
//! Disk and decoding failures never reach the caller: they are logged,
//! handed to the optional error listener and treated as a miss.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use sdmx_core::{
    Clock, DataRepository, Result, SdmxCache, SdmxError, SystemClock,
    clock::{expiry_of, is_expired},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Debug};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Callback receiving the cache key and the failure of a file operation.
pub type ErrorListener = Arc<dyn Fn(&str, &SdmxError) + Send + Sync>;

/// What a cache file holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// The cache key, checked on read against hash collisions.
    pub key: String,
    /// Instant the entry stops being served.
    pub expires_at: DateTime<Utc>,
    /// The cached repository.
    pub value: DataRepository,
}

/// Byte encoding of cache files.
pub trait CacheSerializer: Send + Sync + Debug {
    /// Encodes an entry.
    fn serialize(&self, entry: &FileEntry) -> Result<Vec<u8>>;

    /// Decodes an entry.
    fn deserialize(&self, bytes: &[u8]) -> Result<FileEntry>;
}

/// JSON encoding of cache files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl CacheSerializer for JsonSerializer {
    fn serialize(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        serde_json::to_vec(entry).map_err(|e| SdmxError::Cache(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<FileEntry> {
        serde_json::from_slice(bytes).map_err(|e| SdmxError::Cache(e.to_string()))
    }
}

/// Cache storing one file per key.
pub struct FileCache {
    root: PathBuf,
    prefix: String,
    suffix: String,
    serializer: Arc<dyn CacheSerializer>,
    compress: bool,
    clock: Arc<dyn Clock>,
    on_error: Option<ErrorListener>,
}

impl Debug for FileCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCache")
            .field("root", &self.root)
            .field("prefix", &self.prefix)
            .field("suffix", &self.suffix)
            .field("serializer", &self.serializer)
            .field("compress", &self.compress)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

impl FileCache {
    /// Default file name prefix.
    pub const DEFAULT_PREFIX: &'static str = "sdmx_";
    /// Default file name suffix.
    pub const DEFAULT_SUFFIX: &'static str = ".dat";

    /// Create a cache rooted at a directory, created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: Self::DEFAULT_PREFIX.to_string(),
            suffix: Self::DEFAULT_SUFFIX.to_string(),
            serializer: Arc::new(JsonSerializer),
            compress: false,
            clock: Arc::new(SystemClock),
            on_error: None,
        }
    }

    /// Set the file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the file name suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the byte encoding of cache files.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn CacheSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Enable or disable gzip compression of cache files.
    #[must_use]
    pub const fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Use another clock to compute expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Receive every failure swallowed by the cache.
    #[must_use]
    pub fn with_error_listener(mut self, listener: ErrorListener) -> Self {
        self.on_error = Some(listener);
        self
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file holding a key.
    #[must_use]
    pub fn path_of(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root
            .join(format!("{}{}{}", self.prefix, hex::encode(digest), self.suffix))
    }

    fn is_cache_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&self.prefix) && name.ends_with(&self.suffix))
    }

    fn report(&self, key: &str, error: &SdmxError) {
        warn!(key, error = %error, "File cache failure, treating as a miss");
        if let Some(listener) = &self.on_error {
            listener(key, error);
        }
    }

    fn encode(&self, entry: &FileEntry) -> Result<Vec<u8>> {
        let bytes = self.serializer.serialize(entry)?;
        if !self.compress {
            return Ok(bytes);
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes)?;
        Ok(encoder.finish()?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<FileEntry> {
        if !self.compress {
            return self.serializer.deserialize(bytes);
        }
        let mut decoded = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut decoded)?;
        self.serializer.deserialize(&decoded)
    }

    /// Reads an entry; `Ok(None)` when the file does not exist.
    async fn read_entry(&self, path: &Path) -> Result<Option<FileEntry>> {
        match fs::read(path).await {
            Ok(bytes) => self.decode(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_entry(&self, path: &Path, entry: &FileEntry) -> Result<()> {
        let bytes = self.encode(entry)?;
        fs::create_dir_all(&self.root).await?;
        let root = self.root.clone();
        let path = path.to_path_buf();
        // Each writer gets its own temporary file, renamed over the entry:
        // readers see a whole file and the last rename wins.
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = tempfile::Builder::new()
                .prefix(".tmp-")
                .tempfile_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&path).map_err(|e| SdmxError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| SdmxError::Cache(e.to_string()))?
    }

    async fn remove(&self, key: &str, path: &Path) {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => self.report(key, &SdmxError::from(e)),
            _ => {}
        }
    }

    async fn cache_files(&self) -> Result<Vec<PathBuf>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if self.is_cache_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl SdmxCache for FileCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<DataRepository>> {
        let path = self.path_of(key);
        let entry = match self.read_entry(&path).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("Cache miss");
                return Ok(None);
            }
            Err(e) => {
                self.report(key, &e);
                return Ok(None);
            }
        };

        if entry.key != key {
            debug!(stored = %entry.key, "Cache file holds another key");
            return Ok(None);
        }
        if is_expired(self.clock.now(), entry.expires_at) {
            debug!("Evicting expired entry");
            self.remove(key, &path).await;
            return Ok(None);
        }
        debug!("Cache hit");
        Ok(Some(entry.value))
    }

    #[instrument(skip(self, value), fields(repository = %value.name()))]
    async fn put(&self, key: &str, value: DataRepository, ttl: Duration) -> Result<()> {
        let entry = FileEntry {
            key: key.to_string(),
            expires_at: expiry_of(self.clock.now(), ttl),
            value,
        };
        let path = self.path_of(key);
        match self.write_entry(&path, &entry).await {
            Ok(()) => debug!(path = %path.display(), "Cached entry"),
            Err(e) => self.report(key, &e),
        }
        Ok(())
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut removed = 0usize;
        for path in self.cache_files().await? {
            let expired = match self.read_entry(&path).await {
                Ok(Some(entry)) => is_expired(now, entry.expires_at),
                Ok(None) => false,
                Err(e) => {
                    self.report(&path.display().to_string(), &e);
                    false
                }
            };
            if expired {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!("Purged {} expired cache files", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        for path in self.cache_files().await? {
            fs::remove_file(&path).await?;
        }
        debug!("Cleared all cache files");
        Ok(())
    }
}
