//! Column layout of SDMX-CSV files.

use csv::StringRecord;
use sdmx_core::{
    Attribute, DataStructure, DataStructureRef, DataflowRef, Dimension, Result, SdmxError,
};

/// Header of the column holding the dataflow of each row.
pub const DATAFLOW_COLUMN: &str = "DATAFLOW";

/// Column id of a header cell, without the label of `ID: Label` headers.
pub(crate) fn column_id(header: &str) -> &str {
    header.split(':').next().unwrap_or(header).trim()
}

/// Formats a dataflow the way SDMX-CSV writes it: `AGENCY:ID(VERSION)`.
#[must_use]
pub fn format_dataflow(flow_ref: &DataflowRef) -> String {
    format!("{}:{}({})", flow_ref.agency(), flow_ref.id(), flow_ref.version())
}

/// Parses a dataflow cell written as `AGENCY:ID(VERSION)`.
#[must_use]
pub fn parse_dataflow(cell: &str) -> Option<DataflowRef> {
    let cell = cell.trim();
    let (agency, rest) = cell.split_once(':')?;
    let (id, version) = rest.strip_suffix(')')?.split_once('(')?;
    if agency.is_empty() || id.is_empty() {
        return None;
    }
    Some(DataflowRef::of(agency, id, version))
}

/// Reads the dataflow cell of a record, if the header has a `DATAFLOW` column.
#[must_use]
pub fn dataflow_of(header: &StringRecord, record: &StringRecord) -> Option<DataflowRef> {
    let column = header.iter().position(|h| column_id(h) == DATAFLOW_COLUMN)?;
    record.get(column).and_then(parse_dataflow)
}

/// Where the components of a structure sit in the records of a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) dimensions: Vec<(String, usize)>,
    pub(crate) time: Option<usize>,
    pub(crate) value: Option<usize>,
    pub(crate) attributes: Vec<(String, usize)>,
}

impl Layout {
    /// Maps the header onto a structure.
    ///
    /// Every dimension of the structure must have a column; columns that are
    /// neither dimensions nor the time dimension nor the primary measure are
    /// read as attributes.
    pub(crate) fn resolve(header: &StringRecord, structure: &DataStructure) -> Result<Self> {
        let ids: Vec<&str> = header.iter().map(column_id).collect();
        let position = |id: &str| ids.iter().position(|column| *column == id);

        let dimensions = structure
            .dimension_ids()
            .map(|id| {
                position(id).map(|column| (id.to_string(), column)).ok_or_else(|| {
                    SdmxError::Parse(format!("missing column for dimension '{id}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let flow = position(DATAFLOW_COLUMN);
        let time = position(structure.time_dimension_id());
        let value = position(structure.primary_measure_id());

        let attributes = ids
            .iter()
            .enumerate()
            .filter(|(column, _)| {
                Some(*column) != flow
                    && Some(*column) != time
                    && Some(*column) != value
                    && !dimensions.iter().any(|(_, c)| c == column)
            })
            .map(|(column, id)| ((*id).to_string(), column))
            .collect();

        Ok(Self {
            dimensions,
            time,
            value,
            attributes,
        })
    }

    fn cell<'r>(record: &'r StringRecord, column: Option<usize>) -> &'r str {
        column.and_then(|c| record.get(c)).unwrap_or_default()
    }

    pub(crate) fn period<'r>(&self, record: &'r StringRecord) -> &'r str {
        Self::cell(record, self.time)
    }

    pub(crate) fn value<'r>(&self, record: &'r StringRecord) -> &'r str {
        Self::cell(record, self.value)
    }

    /// A row without period nor value only declares its series.
    pub(crate) fn is_key_only(&self, record: &StringRecord) -> bool {
        self.period(record).is_empty() && self.value(record).is_empty()
    }
}

/// Derives a structure from the header of a file.
///
/// Columns between `DATAFLOW` and the time dimension become dimensions in
/// order, the primary measure is `OBS_VALUE` and every later column is an
/// attribute. Without a time column, every column before `OBS_VALUE` is a
/// dimension. Codes are left undeclared.
///
/// # Errors
/// Returns [`SdmxError::Parse`] if the header has no `OBS_VALUE` column.
pub fn infer_structure(header: &StringRecord, structure_ref: DataStructureRef) -> Result<DataStructure> {
    let ids: Vec<&str> = header.iter().map(column_id).collect();
    let value = ids
        .iter()
        .position(|id| *id == DataStructure::OBS_VALUE)
        .ok_or_else(|| SdmxError::Parse(format!("missing {} column", DataStructure::OBS_VALUE)))?;
    let time = ids.iter().position(|id| *id == DataStructure::TIME_PERIOD);
    let end_of_dimensions = time.unwrap_or(value).min(value);

    let mut builder = DataStructure::builder(structure_ref);
    let mut position = 0u32;
    for id in &ids[..end_of_dimensions] {
        if *id == DATAFLOW_COLUMN {
            continue;
        }
        position += 1;
        builder = builder.dimension(Dimension::new(*id, position));
    }
    for (column, id) in ids.iter().enumerate().skip(end_of_dimensions) {
        if Some(column) == time || column == value || *id == DATAFLOW_COLUMN {
            continue;
        }
        builder = builder.attribute(Attribute::new(*id));
    }
    Ok(builder.build())
}
