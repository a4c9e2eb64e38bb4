//! Cached client wrappers.
//!
//! [`CachedRestClient`] and [`CachedFileClient`] decorate a raw
//! [`SdmxClient`] with the same policy and differ only in the identity
//! their cache keys are derived from:
//!
//! - The flow list, single flows and structures are cached as is.
//! - Queries whose detail ignores data ([`DataDetail::SeriesKeysOnly`],
//!   [`DataDetail::NoData`]) are cached per dataflow and detail level,
//!   independently of the requested key. A cached data set answers a
//!   request only if the key it was fetched with contains the requested
//!   key; the answer is then filtered locally. Otherwise the requested
//!   query is fetched and replaces the entry.
//! - Queries returning observations always go to the source.
//!
//! Hence fetching `Key::ALL` first serves every later key of the same
//! detail from one fetch, while a narrow key fetched first cannot answer a
//! broader one.

mod file;
mod rest;

pub use file::CachedFileClient;
pub use rest::CachedRestClient;

use sdmx_core::{
    DataDetail, DataQuery, DataRepository, DataResponse, DataSet, DataStructure,
    DataStructureRef, Dataflow, DataflowRef, Result, SdmxCache, SdmxClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::typed_id::{TypedId, encode_segment};

/// Time-to-live applied when none is configured.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Joins a scheme and encoded discriminators into a root cache key.
fn root_key(scheme: &str, segments: &[&str]) -> String {
    segments.iter().fold(scheme.to_string(), |mut key, segment| {
        key.push('/');
        key.push_str(&encode_segment(segment));
        key
    })
}

/// Shared core of the cached wrappers.
#[derive(Debug)]
struct CachedClient<C> {
    client: C,
    cache: Arc<dyn SdmxCache>,
    ttl: Duration,
    flows: TypedId<Vec<Dataflow>>,
    flow: TypedId<Dataflow>,
    structure: TypedId<DataStructure>,
    data: TypedId<DataSet>,
}

impl<C: SdmxClient> CachedClient<C> {
    /// `root` is the already discriminated key of this client.
    fn new(client: C, cache: Arc<dyn SdmxCache>, root: String, ttl: Duration) -> Self {
        Self {
            client,
            cache,
            ttl,
            flows: TypedId::new(
                root.clone(),
                |repo| Some(repo.into_flows()),
                |flows| DataRepository::new("flows").with_flows(flows.clone()),
            )
            .with("flows"),
            flow: TypedId::new(
                root.clone(),
                |repo| repo.into_flows().into_iter().next(),
                |flow| DataRepository::new("flow").with_flow(flow.clone()),
            )
            .with("flow"),
            structure: TypedId::new(
                root.clone(),
                |repo| repo.into_structures().into_iter().next(),
                |structure| DataRepository::new("struct").with_structure(structure.clone()),
            )
            .with("struct"),
            data: TypedId::new(
                root,
                |repo| repo.into_data_sets().into_iter().next(),
                |data_set| DataRepository::new("data").with_data_set(data_set.clone()),
            )
            .with("data"),
        }
    }

    fn data_id(&self, flow_ref: &DataflowRef, detail: DataDetail) -> Option<TypedId<DataSet>> {
        let segment = match detail {
            DataDetail::SeriesKeysOnly => "seriesKeysOnly",
            DataDetail::NoData => "noData",
            DataDetail::Full | DataDetail::DataOnly => return None,
        };
        Some(self.data.with(flow_ref.to_string()).with(segment))
    }

    async fn test_client(&self) -> Result<()> {
        self.client.test_client().await
    }

    async fn get_flows(&self) -> Result<Vec<Dataflow>> {
        self.flows
            .load(&*self.cache, || self.client.get_flows(), |_| self.ttl)
            .await
    }

    async fn get_flow(&self, flow_ref: &DataflowRef) -> Result<Dataflow> {
        self.flow
            .with(flow_ref.to_string())
            .load(&*self.cache, || self.client.get_flow(flow_ref), |_| self.ttl)
            .await
    }

    async fn get_structure(&self, structure_ref: &DataStructureRef) -> Result<DataStructure> {
        self.structure
            .with(structure_ref.to_string())
            .load(
                &*self.cache,
                || self.client.get_structure(structure_ref),
                |_| self.ttl,
            )
            .await
    }

    #[instrument(skip(self, structure), fields(source = %self.client.name(), flow = %flow_ref, query = %query))]
    async fn get_data(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        structure: &DataStructure,
    ) -> Result<DataResponse> {
        let Some(id) = self.data_id(flow_ref, query.detail()) else {
            debug!("Data requested, bypassing cache");
            return self.client.get_data(flow_ref, query, structure).await;
        };

        let data_set = id
            .load_if(
                &*self.cache,
                || self.fetch_data_set(flow_ref, query, structure),
                |_| self.ttl,
                |cached| cached.query().key().contains(query.key()),
            )
            .await?;
        Ok(DataResponse::Cursor(data_set.get_data_cursor(query)))
    }

    async fn fetch_data_set(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        structure: &DataStructure,
    ) -> Result<DataSet> {
        debug!(flow = %flow_ref, query = %query, "Fetching data set");
        let mut cursor = self
            .client
            .get_data(flow_ref, query, structure)
            .await?
            .into_cursor();
        let data_set = DataSet::from_cursor(flow_ref.clone(), query.clone(), cursor.as_mut());
        let closed = cursor.close();
        let data_set = data_set?;
        closed?;
        Ok(data_set)
    }
}
