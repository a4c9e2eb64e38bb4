//! Repositories: the container every cached payload is stored in.
//!
//! A [`DataRepository`] groups flows, structures and data sets under a name.
//! It is the serialization boundary of the cache stores, and
//! [`RepositoryClient`] serves one as a source in its own right.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    client::{DataResponse, SdmxClient},
    cursor::FilteredCursor,
    data_set::DataSet,
    error::{Result, SdmxError},
    query::DataQuery,
    types::{DataStructure, DataStructureRef, Dataflow, DataflowRef},
};

/// Flows, structures and data sets grouped under a name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRepository {
    name: String,
    created: DateTime<Utc>,
    structures: Vec<DataStructure>,
    flows: Vec<Dataflow>,
    data_sets: Vec<DataSet>,
}

impl DataRepository {
    /// Creates an empty repository stamped with the current instant.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: Utc::now(),
            structures: Vec::new(),
            flows: Vec::new(),
            data_sets: Vec::new(),
        }
    }

    /// Sets the creation instant.
    #[must_use]
    pub const fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Adds a dataflow.
    #[must_use]
    pub fn with_flow(mut self, flow: Dataflow) -> Self {
        self.flows.push(flow);
        self
    }

    /// Adds several dataflows.
    #[must_use]
    pub fn with_flows(mut self, flows: impl IntoIterator<Item = Dataflow>) -> Self {
        self.flows.extend(flows);
        self
    }

    /// Adds a data structure.
    #[must_use]
    pub fn with_structure(mut self, structure: DataStructure) -> Self {
        self.structures.push(structure);
        self
    }

    /// Adds a data set.
    #[must_use]
    pub fn with_data_set(mut self, data_set: DataSet) -> Self {
        self.data_sets.push(data_set);
        self
    }

    /// Returns the name of this repository.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the creation instant.
    #[must_use]
    pub const fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Returns the dataflows.
    #[must_use]
    pub fn flows(&self) -> &[Dataflow] {
        &self.flows
    }

    /// Returns the data structures.
    #[must_use]
    pub fn structures(&self) -> &[DataStructure] {
        &self.structures
    }

    /// Returns the data sets.
    #[must_use]
    pub fn data_sets(&self) -> &[DataSet] {
        &self.data_sets
    }

    /// Finds a dataflow designated by a reference.
    #[must_use]
    pub fn flow(&self, flow_ref: &DataflowRef) -> Option<&Dataflow> {
        self.flows.iter().find(|f| flow_ref.contains(&f.flow_ref))
    }

    /// Finds a data structure designated by a reference.
    #[must_use]
    pub fn structure(&self, structure_ref: &DataStructureRef) -> Option<&DataStructure> {
        self.structures
            .iter()
            .find(|s| structure_ref.contains(s.structure_ref()))
    }

    /// Finds the data set of a dataflow.
    #[must_use]
    pub fn data_set(&self, flow_ref: &DataflowRef) -> Option<&DataSet> {
        self.data_sets
            .iter()
            .find(|d| flow_ref.contains(d.flow_ref()))
    }

    /// Consumes the repository into its dataflows.
    #[must_use]
    pub fn into_flows(self) -> Vec<Dataflow> {
        self.flows
    }

    /// Consumes the repository into its data structures.
    #[must_use]
    pub fn into_structures(self) -> Vec<DataStructure> {
        self.structures
    }

    /// Consumes the repository into its data sets.
    #[must_use]
    pub fn into_data_sets(self) -> Vec<DataSet> {
        self.data_sets
    }
}

/// A source serving an in-memory repository.
#[derive(Clone, Debug)]
pub struct RepositoryClient {
    repository: DataRepository,
}

impl RepositoryClient {
    /// Serves a repository.
    #[must_use]
    pub const fn new(repository: DataRepository) -> Self {
        Self { repository }
    }

    /// Returns the served repository.
    #[must_use]
    pub const fn repository(&self) -> &DataRepository {
        &self.repository
    }
}

#[async_trait]
impl SdmxClient for RepositoryClient {
    fn name(&self) -> &str {
        self.repository.name()
    }

    async fn test_client(&self) -> Result<()> {
        Ok(())
    }

    async fn get_flows(&self) -> Result<Vec<Dataflow>> {
        Ok(self.repository.flows().to_vec())
    }

    async fn get_structure(&self, structure_ref: &DataStructureRef) -> Result<DataStructure> {
        self.repository
            .structure(structure_ref)
            .cloned()
            .ok_or_else(|| SdmxError::MissingStructure {
                origin: self.name().to_string(),
                structure: structure_ref.to_string(),
            })
    }

    async fn get_data(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        _structure: &DataStructure,
    ) -> Result<DataResponse> {
        let Some(data_set) = self.repository.data_set(flow_ref) else {
            debug!(flow = %flow_ref, "No data set in repository");
            return Ok(DataResponse::Empty);
        };
        let cursor = data_set.get_data_cursor(&DataQuery::ALL);
        Ok(DataResponse::Cursor(FilteredCursor::wrap(cursor, query)))
    }
}
