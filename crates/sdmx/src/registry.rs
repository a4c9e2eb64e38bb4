//! Registry of sources sharing one cache.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use sdmx_cache::{CachedFileClient, CachedRestClient, DEFAULT_TTL, InMemoryCache};
use sdmx_core::{Languages, Result, SdmxCache, SdmxError};
use sdmx_file::{FileClient, FileSource};
use sdmx_web::{SdmxWebClient, WebSource};

use crate::config::SdmxConfig;
use crate::connection::SdmxConnection;

/// Registry of REST sources and the cache their connections share.
///
/// Sources are registered explicitly, either one by one or from an
/// [`SdmxConfig`]. Every connection opened by the registry goes through a
/// cached client over the registry's cache.
///
/// # Example
///
/// ```rust,ignore
/// use sdmx::{DataQuery, DataflowRef, SdmxConfig, SdmxRegistry};
///
/// let registry = SdmxRegistry::from_config(&SdmxConfig::from_json_file("sdmx.json")?)?;
/// let connection = registry.connect("ECB")?;
/// let data = connection
///     .get_data(&DataflowRef::parse("ECB,EXR,1.0"), &DataQuery::ALL)
///     .await?;
/// ```
pub struct SdmxRegistry {
    sources: BTreeMap<String, WebSource>,
    cache: Arc<dyn SdmxCache>,
    ttl: Duration,
    languages: Languages,
    http: reqwest::Client,
}

impl std::fmt::Debug for SdmxRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdmxRegistry")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("cache", &self.cache)
            .field("ttl", &self.ttl)
            .field("languages", &self.languages)
            .finish_non_exhaustive()
    }
}

impl Default for SdmxRegistry {
    fn default() -> Self {
        Self {
            sources: BTreeMap::new(),
            cache: Arc::new(InMemoryCache::new()),
            ttl: DEFAULT_TTL,
            languages: Languages::default(),
            http: reqwest::Client::new(),
        }
    }
}

impl SdmxRegistry {
    /// Create an empty registry over an in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a configuration.
    ///
    /// # Errors
    /// Fails if the configured cache store cannot be created.
    pub fn from_config(config: &SdmxConfig) -> Result<Self> {
        let mut registry = Self::new()
            .with_cache(config.cache.build()?)
            .with_ttl(config.cache.ttl())
            .with_languages(config.languages.clone());
        for source in &config.sources {
            registry.register(source.clone());
        }
        Ok(registry)
    }

    /// Set the cache shared by connections.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn SdmxCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Set the time-to-live of entries of REST sources.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the language priority of sources that do not set their own.
    #[must_use]
    pub fn with_languages(mut self, languages: Languages) -> Self {
        self.languages = languages;
        self
    }

    /// Set the HTTP client shared by REST sources.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Register a REST source, replacing any source with the same id.
    pub fn register(&mut self, source: WebSource) {
        debug!(source = %source.id, endpoint = %source.endpoint, "Registering source");
        self.sources.insert(source.id.clone(), source);
    }

    /// Returns the registered sources ordered by id.
    pub fn sources(&self) -> impl Iterator<Item = &WebSource> {
        self.sources.values()
    }

    /// Returns a registered source.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<&WebSource> {
        self.sources.get(id)
    }

    /// Returns the shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn SdmxCache> {
        &self.cache
    }

    /// Open a cached connection to a registered source.
    ///
    /// # Errors
    /// Returns [`SdmxError::SourceNotFound`] for an unknown id and
    /// [`SdmxError::NotSupported`] for a source in an unknown dialect.
    pub fn connect(&self, id: &str) -> Result<SdmxConnection> {
        let mut source = self
            .sources
            .get(id)
            .cloned()
            .ok_or_else(|| SdmxError::SourceNotFound(id.to_string()))?;
        if source.languages == Languages::default() {
            source.languages = self.languages.clone();
        }

        let cached = CachedRestClient::new(
            SdmxWebClient::with_http_client(source.clone(), self.http.clone())?,
            Arc::clone(&self.cache),
            source.endpoint.as_str(),
            &source.dialect,
            &source.languages,
        )
        .with_ttl(self.ttl);
        debug!(source = id, "Connected");
        Ok(SdmxConnection::new(Arc::new(cached)))
    }

    /// Open a cached connection to a data file.
    #[must_use]
    pub fn connect_file(&self, source: FileSource) -> SdmxConnection {
        let cached = CachedFileClient::new(
            FileClient::new(source.clone()),
            Arc::clone(&self.cache),
            &source.data,
            source.structure_path(),
            &source.languages,
        );
        debug!(file = %source.data.display(), "Connected");
        SdmxConnection::new(Arc::new(cached))
    }
}
