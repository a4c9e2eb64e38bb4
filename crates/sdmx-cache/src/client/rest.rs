//! Cached wrapper of REST clients.

use async_trait::async_trait;
use sdmx_core::{
    DataQuery, DataResponse, DataStructure, DataStructureRef, Dataflow, DataflowRef, Languages,
    Result, SdmxCache, SdmxClient,
};
use std::sync::Arc;
use std::time::Duration;

use super::{CachedClient, DEFAULT_TTL, root_key};

/// A REST client whose metadata and key enumerations are cached.
///
/// Cache keys live under `cache:rest` and are discriminated by the source
/// endpoint, its dialect and the language priority of the labels.
#[derive(Debug)]
pub struct CachedRestClient<C> {
    inner: CachedClient<C>,
}

impl<C: SdmxClient> CachedRestClient<C> {
    /// Wraps a raw client with the [`DEFAULT_TTL`].
    #[must_use]
    pub fn new(
        client: C,
        cache: Arc<dyn SdmxCache>,
        endpoint: &str,
        dialect: &str,
        languages: &Languages,
    ) -> Self {
        let root = root_key("cache:rest", &[endpoint, dialect, languages.as_str()]);
        Self {
            inner: CachedClient::new(client, cache, root, DEFAULT_TTL),
        }
    }

    /// Sets the time-to-live of every entry stored from now on.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.inner.ttl = ttl;
        self
    }

    /// Returns the wrapped client.
    #[must_use]
    pub const fn raw(&self) -> &C {
        &self.inner.client
    }
}

#[async_trait]
impl<C: SdmxClient> SdmxClient for CachedRestClient<C> {
    fn name(&self) -> &str {
        self.inner.client.name()
    }

    async fn test_client(&self) -> Result<()> {
        self.inner.test_client().await
    }

    async fn get_flows(&self) -> Result<Vec<Dataflow>> {
        self.inner.get_flows().await
    }

    async fn get_flow(&self, flow_ref: &DataflowRef) -> Result<Dataflow> {
        self.inner.get_flow(flow_ref).await
    }

    async fn get_structure(&self, structure_ref: &DataStructureRef) -> Result<DataStructure> {
        self.inner.get_structure(structure_ref).await
    }

    async fn get_data(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        structure: &DataStructure,
    ) -> Result<DataResponse> {
        self.inner.get_data(flow_ref, query, structure).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryCache;
    use crate::client::tests::{CountingClient, flow_ref, series_keys, structure};
    use sdmx_core::{DataDetail, Key};

    fn client(
        raw: &Arc<CountingClient>,
        cache: &Arc<InMemoryCache>,
        languages: &str,
    ) -> CachedRestClient<Arc<CountingClient>> {
        CachedRestClient::new(
            Arc::clone(raw),
            cache.clone(),
            "https://sdmx.example.org/service",
            "SDMX21",
            &Languages::new(languages),
        )
    }

    #[tokio::test]
    async fn test_rest_clients_share_entries_per_identity() {
        let raw = Arc::new(CountingClient::new());
        let cache = Arc::new(InMemoryCache::new());
        let query = DataQuery::of(Key::ALL, DataDetail::SeriesKeysOnly);

        let first = client(&raw, &cache, "en");
        first.get_data(&flow_ref(), &query, &structure()).await.unwrap();

        // Same identity, served from the shared store
        let second = client(&raw, &cache, "en");
        let keys = series_keys(second.get_data(&flow_ref(), &query, &structure()).await.unwrap());
        assert_eq!(keys.len(), 3);
        assert_eq!(raw.data_calls(), 1);

        // Another language priority is another identity
        let french = client(&raw, &cache, "fr");
        french.get_data(&flow_ref(), &query, &structure()).await.unwrap();
        assert_eq!(raw.data_calls(), 2);
    }

    #[tokio::test]
    async fn test_rest_client_ttl() {
        let raw = Arc::new(CountingClient::new());
        let cache = Arc::new(InMemoryCache::new());
        let cached = client(&raw, &cache, "en").with_ttl(Duration::ZERO);

        cached.get_flows().await.unwrap();
        cached.get_flows().await.unwrap();
        assert_eq!(raw.flow_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(cached.name(), "counting");
    }
}
