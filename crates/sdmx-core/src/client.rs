//! Raw client trait.
//!
//! This module defines [`SdmxClient`], the narrow interface every transport
//! (files, REST endpoints, in-memory repositories) implements and that the
//! cached wrappers decorate.

use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::{
    cursor::{DataCursor, SeriesCursor},
    error::{Result, SdmxError},
    query::DataQuery,
    types::{DataStructure, DataStructureRef, Dataflow, DataflowRef},
};

/// Outcome of a data request that did not fail.
///
/// Providers answer "no results matching the query" in many ways; clients
/// map those answers to [`DataResponse::Empty`] so callers can tell a valid
/// empty result from a failed fetch.
pub enum DataResponse {
    /// Series were returned.
    Cursor(Box<dyn DataCursor>),
    /// The source has no series matching the query.
    Empty,
}

impl DataResponse {
    /// Turns the response into a cursor, empty for [`DataResponse::Empty`].
    #[must_use]
    pub fn into_cursor(self) -> Box<dyn DataCursor> {
        match self {
            Self::Cursor(cursor) => cursor,
            Self::Empty => Box::new(SeriesCursor::empty()),
        }
    }

    /// Returns true for [`DataResponse::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl Debug for DataResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cursor(cursor) => f.debug_tuple("Cursor").field(cursor).finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Transport-specific access to an SDMX source.
///
/// Every method fails with an I/O-style error ([`SdmxError::Network`],
/// [`SdmxError::Io`], [`SdmxError::Parse`]) on transport failure.
#[async_trait]
pub trait SdmxClient: Send + Sync + Debug {
    /// Returns the identity of the source, used in diagnostics.
    fn name(&self) -> &str;

    /// Checks that the source exists and can be reached, without fetching
    /// data.
    ///
    /// # Errors
    /// Fails with [`SdmxError::SourceNotFound`] or [`SdmxError::Unreachable`].
    async fn test_client(&self) -> Result<()>;

    /// Lists the dataflows of the source.
    async fn get_flows(&self) -> Result<Vec<Dataflow>>;

    /// Resolves one dataflow.
    ///
    /// The default implementation looks the reference up in
    /// [`SdmxClient::get_flows`].
    async fn get_flow(&self, flow_ref: &DataflowRef) -> Result<Dataflow> {
        self.get_flows()
            .await?
            .into_iter()
            .find(|flow| flow_ref.contains(&flow.flow_ref))
            .ok_or_else(|| SdmxError::MissingFlow {
                origin: self.name().to_string(),
                flow: flow_ref.to_string(),
            })
    }

    /// Resolves a data structure.
    async fn get_structure(&self, structure_ref: &DataStructureRef) -> Result<DataStructure>;

    /// Opens the series of a dataflow matching a query.
    async fn get_data(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        structure: &DataStructure,
    ) -> Result<DataResponse>;
}

#[async_trait]
impl<T: SdmxClient + ?Sized> SdmxClient for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn test_client(&self) -> Result<()> {
        (**self).test_client().await
    }

    async fn get_flows(&self) -> Result<Vec<Dataflow>> {
        (**self).get_flows().await
    }

    async fn get_flow(&self, flow_ref: &DataflowRef) -> Result<Dataflow> {
        (**self).get_flow(flow_ref).await
    }

    async fn get_structure(&self, structure_ref: &DataStructureRef) -> Result<DataStructure> {
        (**self).get_structure(structure_ref).await
    }

    async fn get_data(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        structure: &DataStructure,
    ) -> Result<DataResponse> {
        (**self).get_data(flow_ref, query, structure).await
    }
}
