//! Cached wrapper of file clients.

use async_trait::async_trait;
use sdmx_core::{
    DataQuery, DataResponse, DataStructure, DataStructureRef, Dataflow, DataflowRef, Languages,
    Result, SdmxCache, SdmxClient,
};
use std::path::Path;
use std::sync::Arc;

use super::{CachedClient, DEFAULT_TTL, root_key};

/// A file client whose metadata and key enumerations are cached.
///
/// Cache keys live under `cache:file` and are discriminated by the data
/// file, the structure file and the language priority of the labels.
/// Entries expire after a fixed time-to-live.
// TODO: expire entries when the data file modification time changes instead of after a fixed ttl
#[derive(Debug)]
pub struct CachedFileClient<C> {
    inner: CachedClient<C>,
}

impl<C: SdmxClient> CachedFileClient<C> {
    /// Wraps a raw client reading `data` and, optionally, `structure`.
    #[must_use]
    pub fn new(
        client: C,
        cache: Arc<dyn SdmxCache>,
        data: &Path,
        structure: Option<&Path>,
        languages: &Languages,
    ) -> Self {
        let data = data.to_string_lossy();
        let structure = structure.map(Path::to_string_lossy).unwrap_or_default();
        let root = root_key(
            "cache:file",
            &[&*data, &*structure, languages.as_str()],
        );
        Self {
            inner: CachedClient::new(client, cache, root, DEFAULT_TTL),
        }
    }

    /// Returns the wrapped client.
    #[must_use]
    pub const fn raw(&self) -> &C {
        &self.inner.client
    }
}

#[async_trait]
impl<C: SdmxClient> SdmxClient for CachedFileClient<C> {
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
