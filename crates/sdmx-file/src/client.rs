use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, Trim};
use sdmx_core::{
    DataQuery, DataResponse, DataStructure, DataStructureRef, Dataflow, DataflowRef,
    FilteredCursor, Result, SdmxClient, SdmxError, StructureMessage,
};
use sdmx_csv::{SdmxCsvCursor, dataflow_of, infer_structure};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use tracing::{debug, instrument};

use crate::source::FileSource;

/// Raw client reading a [`FileSource`].
///
/// Nothing is kept between calls: every call reads the file again.
#[derive(Debug, Clone)]
pub struct FileClient {
    source: FileSource,
    name: String,
}

/// The dataflow of a source and the structure of its data.
struct Description {
    flow: Dataflow,
    structure: DataStructure,
}

fn parse_error(path: &Path, e: &csv::Error) -> SdmxError {
    SdmxError::Parse(format!("{}: {e}", path.display()))
}

/// Runs file reads off the async worker threads.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SdmxError::Other(e.to_string()))?
}

/// Reads the header and the first row of a data file.
fn read_head(path: &Path) -> Result<(StringRecord, Option<StringRecord>)> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(BufReader::new(File::open(path)?));
    let header = reader.headers().map_err(|e| parse_error(path, &e))?.clone();
    let first = reader
        .records()
        .next()
        .transpose()
        .map_err(|e| parse_error(path, &e))?;
    Ok((header, first))
}

async fn check_exists(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(SdmxError::SourceNotFound(format!(
            "'{}' is not a file",
            path.display()
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(SdmxError::SourceNotFound(path.display().to_string()))
        }
        Err(e) => Err(SdmxError::Io(e)),
    }
}

impl FileClient {
    /// Creates a client over a source.
    #[must_use]
    pub fn new(source: FileSource) -> Self {
        let name = source.data.display().to_string();
        Self { source, name }
    }

    /// Returns the source.
    #[must_use]
    pub const fn source(&self) -> &FileSource {
        &self.source
    }

    async fn describe(&self) -> Result<Description> {
        let data = self.source.data.clone();
        let (header, first) = blocking(move || read_head(&data)).await?;
        let message = match self.source.structure_path() {
            Some(path) => Some(StructureMessage::from_slice(&tokio::fs::read(path).await?)?),
            None => None,
        };

        let flow_ref = self
            .source
            .flow
            .clone()
            .or_else(|| first.as_ref().and_then(|row| dataflow_of(&header, row)))
            .or_else(|| {
                message
                    .as_ref()
                    .and_then(|m| m.flows.first())
                    .map(|f| f.flow_ref.clone())
            })
            .unwrap_or_else(|| DataflowRef::parse(&self.source.default_flow_id()));

        let flow = message
            .as_ref()
            .and_then(|m| m.flows.iter().find(|f| flow_ref.contains(&f.flow_ref)))
            .cloned()
            .unwrap_or_else(|| {
                let structure_ref =
                    DataStructureRef::of(flow_ref.agency(), flow_ref.id(), flow_ref.version());
                let name = flow_ref.id().to_string();
                Dataflow::new(flow_ref, structure_ref, name)
            });

        let structure = match message {
            Some(message) => {
                // A message describing a single structure may not name it
                // the way the flow does.
                let index = message
                    .structures
                    .iter()
                    .position(|s| flow.structure_ref.contains(s.structure_ref()))
                    .unwrap_or(0);
                message
                    .structures
                    .into_iter()
                    .nth(index)
                    .ok_or_else(|| SdmxError::MissingStructure {
                        origin: self.name.clone(),
                        structure: flow.structure_ref.to_string(),
                    })?
            }
            None => infer_structure(&header, flow.structure_ref.clone())?,
        };
        debug!(flow = %flow.flow_ref, structure = %structure.structure_ref(), "Described file");

        Ok(Description { flow, structure })
    }
}

#[async_trait]
impl SdmxClient for FileClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn test_client(&self) -> Result<()> {
        check_exists(&self.source.data).await?;
        if let Some(path) = self.source.structure_path() {
            check_exists(path).await?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(file = %self.name))]
    async fn get_flows(&self) -> Result<Vec<Dataflow>> {
        Ok(vec![self.describe().await?.flow])
    }

    #[instrument(skip(self), fields(file = %self.name))]
    async fn get_structure(&self, structure_ref: &DataStructureRef) -> Result<DataStructure> {
        let Description { structure, .. } = self.describe().await?;
        if structure_ref.contains(structure.structure_ref()) {
            Ok(structure)
        } else {
            Err(SdmxError::MissingStructure {
                origin: self.name.clone(),
                structure: structure_ref.to_string(),
            })
        }
    }

    #[instrument(skip(self, structure), fields(file = %self.name, flow = %flow_ref))]
    async fn get_data(
        &self,
        flow_ref: &DataflowRef,
        query: &DataQuery,
        structure: &DataStructure,
    ) -> Result<DataResponse> {
        let Description { flow, .. } = self.describe().await?;
        if !flow_ref.contains(&flow.flow_ref) {
            return Err(SdmxError::MissingFlow {
                origin: self.name.clone(),
                flow: flow_ref.to_string(),
            });
        }

        let data = self.source.data.clone();
        let structure = structure.clone();
        let cursor = blocking(move || {
            SdmxCsvCursor::new(BufReader::new(File::open(&data)?), &structure)
        })
        .await?;
        debug!(key = %query.key(), detail = ?query.detail(), "Opened data file");
        Ok(DataResponse::Cursor(FilteredCursor::wrap(
            Box::new(cursor),
            query,
        )))
    }
}
