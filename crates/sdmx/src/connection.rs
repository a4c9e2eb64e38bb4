//! Read API over one source.

use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

use sdmx_core::{
    DataCursor, DataQuery, DataSet, DataStructure, Dataflow, DataflowRef, Result, SdmxClient,
    SdmxError, Series, SeriesIter,
};

/// An open connection to a source.
///
/// Every operation first checks that the connection is open, then that the
/// dataflow is known to the source and, for data, that the key fits the
/// structure of the dataflow. Data is only read once those checks pass.
///
/// Cursors returned by a connection are independent of it: closing the
/// connection does not close them.
#[derive(Debug)]
pub struct SdmxConnection {
    client: Arc<dyn SdmxClient>,
    closed: AtomicBool,
}

impl SdmxConnection {
    /// Opens a connection over a client, usually a cached one.
    #[must_use]
    pub fn new(client: Arc<dyn SdmxClient>) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the identity of the source.
    #[must_use]
    pub fn name(&self) -> &str {
        self.client.name()
    }

    /// Returns true once [`SdmxConnection::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the connection. Closing twice is a no-op.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(source = self.name(), "Connection closed");
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SdmxError::ConnectionClosed {
                origin: self.name().to_string(),
            });
        }
        Ok(())
    }

    /// Checks that the source exists and can be reached.
    ///
    /// # Errors
    /// Fails with [`SdmxError::SourceNotFound`] or [`SdmxError::Unreachable`].
    pub async fn test_connection(&self) -> Result<()> {
        self.check_open()?;
        self.client.test_client().await
    }

    /// Lists the dataflows of the source.
    pub async fn get_flows(&self) -> Result<Vec<Dataflow>> {
        self.check_open()?;
        self.client.get_flows().await
    }

    /// Resolves a dataflow.
    ///
    /// # Errors
    /// Returns [`SdmxError::MissingFlow`] if the source does not know it.
    pub async fn get_flow(&self, flow_ref: &DataflowRef) -> Result<Dataflow> {
        self.check_open()?;
        self.client.get_flow(flow_ref).await
    }

    /// Resolves the structure of a dataflow.
    pub async fn get_structure(&self, flow_ref: &DataflowRef) -> Result<DataStructure> {
        let flow = self.get_flow(flow_ref).await?;
        self.client.get_structure(&flow.structure_ref).await
    }

    async fn open(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
    ) -> Result<(Dataflow, Box<dyn DataCursor>)> {
        let flow = self.get_flow(flow_ref).await?;
        let structure = self.client.get_structure(&flow.structure_ref).await?;
        query.key().validate_on(&structure)?;

        let cursor = self
            .client
            .get_data(&flow.flow_ref, query, &structure)
            .await?
            .into_cursor();
        Ok((flow, cursor))
    }

    /// Opens a cursor over the series of a dataflow matching a query.
    ///
    /// # Errors
    /// Returns [`SdmxError::ConnectionClosed`], [`SdmxError::MissingFlow`]
    /// or [`SdmxError::InvalidKey`] before any data is read.
    #[instrument(skip(self), fields(source = self.name(), flow = %flow_ref))]
    pub async fn get_data_stream(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
    ) -> Result<Box<dyn DataCursor>> {
        self.open(flow_ref, query).await.map(|(_, cursor)| cursor)
    }

    /// Reads the series of a dataflow matching a query into a data set.
    ///
    /// Reads the same cursor as [`SdmxConnection::get_data_stream`] and
    /// closes it, whatever the outcome.
    #[instrument(skip(self), fields(source = self.name(), flow = %flow_ref))]
    pub async fn get_data(&self, flow_ref: &DataflowRef, query: &DataQuery) -> Result<DataSet> {
        let (flow, mut cursor) = self.open(flow_ref, query).await?;
        let data_set = DataSet::from_cursor(flow.flow_ref, query.clone(), cursor.as_mut());
        let closed = cursor.close();
        let data_set = data_set?;
        closed?;
        debug!(series = data_set.len(), "Read data set");
        Ok(data_set)
    }

    /// Streams the series of a dataflow matching a query.
    ///
    /// The underlying cursor is closed when the stream ends or is dropped.
    pub async fn get_series_stream(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
    ) -> Result<BoxStream<'static, Result<Series>>> {
        let cursor = self.get_data_stream(flow_ref, query).await?;
        Ok(stream::iter(SeriesIter::new(cursor, query.detail())).boxed())
    }
}
