//! Streaming SDMX-CSV decoder.

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use sdmx_core::{
    DataCursor, DataStructure, Frequency, Key, KeyBuilder, Obs, Result, SdmxError,
    cursor::{CursorState, ObsState, check_attribute_name},
    period::parse_period,
};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use tracing::trace;

use crate::layout::Layout;

type Records = StringRecordsIntoIter<Box<dyn Read + Send>>;

pub(crate) fn csv_error(e: csv::Error) -> SdmxError {
    let message = e.to_string();
    match e.into_kind() {
        csv::ErrorKind::Io(io) => SdmxError::Io(io),
        _ => SdmxError::Parse(message),
    }
}

fn parse_value(text: &str) -> Result<Option<f64>> {
    if text.is_empty() || text.eq_ignore_ascii_case("NaN") {
        return Ok(None);
    }
    text.parse()
        .map(Some)
        .map_err(|_| SdmxError::Parse(format!("invalid observation value '{text}'")))
}

/// Cursor over the rows of an SDMX-CSV stream.
///
/// Consecutive rows sharing a key form one series, so a series whose rows
/// are interleaved with others is yielded once per run of rows;
/// [`DataSet::from_cursor`](sdmx_core::DataSet::from_cursor) merges them
/// back. A row with neither period nor value declares a series without
/// observations. Series attributes are read from the first row of each
/// series.
pub struct SdmxCsvCursor {
    records: Option<Records>,
    layout: Layout,
    builder: KeyBuilder,
    lookahead: Option<StringRecord>,
    key: Key,
    freq: Frequency,
    attributes: BTreeMap<String, String>,
    obs: Obs,
    state: CursorState,
}

impl fmt::Debug for SdmxCsvCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdmxCsvCursor")
            .field("layout", &self.layout)
            .field("key", &self.key)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SdmxCsvCursor {
    /// Opens a cursor over a stream, reading its header.
    ///
    /// # Errors
    /// Fails if the header cannot be read or lacks a dimension column.
    pub fn new(reader: impl Read + Send + 'static, structure: &DataStructure) -> Result<Self> {
        let reader: Box<dyn Read + Send> = Box::new(reader);
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let header = csv.headers().map_err(csv_error)?.clone();
        let layout = Layout::resolve(&header, structure)?;
        Ok(Self {
            records: Some(csv.into_records()),
            layout,
            builder: KeyBuilder::new(structure.dimension_ids()),
            lookahead: None,
            key: Key::ALL,
            freq: Frequency::Undefined,
            attributes: BTreeMap::new(),
            obs: Obs::new(None, None),
            state: CursorState::BeforeFirstSeries,
        })
    }

    fn next_record(&mut self) -> Result<Option<StringRecord>> {
        if let Some(record) = self.lookahead.take() {
            return Ok(Some(record));
        }
        match self.records.as_mut() {
            Some(records) => records.next().transpose().map_err(csv_error),
            None => Err(SdmxError::CursorClosed),
        }
    }

    fn key_of(&mut self, record: &StringRecord) -> Key {
        self.builder.clear();
        for (id, column) in &self.layout.dimensions {
            self.builder.put(id, record.get(*column).unwrap_or_default());
        }
        self.builder.build()
    }

    fn frequency_of(&self, attributes: &BTreeMap<String, String>) -> Frequency {
        self.builder
            .code(Frequency::DIMENSION_ID)
            .or_else(|| attributes.get(Frequency::DIMENSION_ID).map(String::as_str))
            .map_or(Frequency::Undefined, Frequency::from_code)
    }

    fn skip_current_series(&mut self) -> Result<()> {
        while let Some(record) = self.next_record()? {
            if self.key_of(&record) != self.key {
                self.lookahead = Some(record);
                break;
            }
        }
        Ok(())
    }
}

impl DataCursor for SdmxCsvCursor {
    fn next_series(&mut self) -> Result<bool> {
        self.state.check_open()?;
        match self.state {
            CursorState::AfterLastSeries => return Ok(false),
            CursorState::InSeries(_) => self.skip_current_series()?,
            _ => {}
        }

        let Some(record) = self.next_record()? else {
            self.state = CursorState::AfterLastSeries;
            return Ok(false);
        };
        self.key = self.key_of(&record);
        self.attributes = self
            .layout
            .attributes
            .iter()
            .filter_map(|(id, column)| {
                record
                    .get(*column)
                    .filter(|value| !value.is_empty())
                    .map(|value| (id.clone(), value.to_string()))
            })
            .collect();
        self.freq = self.frequency_of(&self.attributes);
        if !self.layout.is_key_only(&record) {
            self.lookahead = Some(record);
        }
        trace!(key = %self.key, "Next series");
        self.state = CursorState::InSeries(ObsState::BeforeFirstObs);
        Ok(true)
    }

    fn series_key(&self) -> Result<&Key> {
        self.state.check_series()?;
        Ok(&self.key)
    }

    fn series_frequency(&self) -> Result<Frequency> {
        self.state.check_series()?;
        Ok(self.freq)
    }

    fn series_attribute(&self, name: &str) -> Result<Option<&str>> {
        check_attribute_name(name)?;
        self.state.check_series()?;
        Ok(self.attributes.get(name).map(String::as_str))
    }

    fn series_attributes(&self) -> Result<&BTreeMap<String, String>> {
        self.state.check_series()?;
        Ok(&self.attributes)
    }

    fn next_obs(&mut self) -> Result<bool> {
        self.state.check_series()?;
        if self.state == CursorState::InSeries(ObsState::AfterLastObs) {
            return Ok(false);
        }
        loop {
            let Some(record) = self.next_record()? else {
                self.state = CursorState::InSeries(ObsState::AfterLastObs);
                return Ok(false);
            };
            if self.key_of(&record) != self.key {
                self.lookahead = Some(record);
                self.state = CursorState::InSeries(ObsState::AfterLastObs);
                return Ok(false);
            }
            if self.layout.is_key_only(&record) {
                continue;
            }
            self.obs = Obs::new(
                parse_period(self.layout.period(&record)),
                parse_value(self.layout.value(&record))?,
            );
            self.state = CursorState::InSeries(ObsState::InObs);
            return Ok(true);
        }
    }

    fn obs_period(&self) -> Result<Option<NaiveDateTime>> {
        self.state.check_obs()?;
        Ok(self.obs.period)
    }

    fn obs_value(&self) -> Result<Option<f64>> {
        self.state.check_obs()?;
        Ok(self.obs.value)
    }

    fn close(&mut self) -> Result<()> {
        if !self.state.is_closed() {
            self.records = None;
            self.lookahead = None;
            self.state = CursorState::Closed;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::infer_structure;
    use sdmx_core::{DataQuery, DataSet, DataStructureRef, DataflowRef};
    use std::io::Cursor;

    const SAMPLE: &str = "\
DATAFLOW,FREQ,REF_AREA,SECTOR,TIME_PERIOD,OBS_VALUE,TITLE
ECB:STS(1.0),M,BE,INDUSTRY,2020-01,1.5,Belgium
ECB:STS(1.0),M,BE,INDUSTRY,2020-02,NaN,Belgium
ECB:STS(1.0),M,FR,INDUSTRY,,,France
ECB:STS(1.0),A,FR,RETAIL,2019,4,
ECB:STS(1.0),A,FR,RETAIL,2020,5,
";

    fn open(text: &'static str) -> SdmxCsvCursor {
        let header = csv::Reader::from_reader(text.as_bytes())
            .headers()
            .unwrap()
            .clone();
        let structure = infer_structure(&header, DataStructureRef::parse("ECB,STS,1.0")).unwrap();
        SdmxCsvCursor::new(Cursor::new(text), &structure).unwrap()
    }

    #[test]
    fn test_reads_series_and_obs() {
        let mut cursor = open(SAMPLE);

        assert!(cursor.next_series().unwrap());
        assert_eq!(cursor.series_key().unwrap(), &Key::parse("M.BE.INDUSTRY"));
        assert_eq!(cursor.series_frequency().unwrap(), Frequency::Monthly);
        assert_eq!(cursor.series_attribute("TITLE").unwrap(), Some("Belgium"));
        assert!(cursor.next_obs().unwrap());
        assert_eq!(cursor.obs_period().unwrap(), parse_period("2020-01"));
        assert_eq!(cursor.obs_value().unwrap(), Some(1.5));
        assert!(cursor.next_obs().unwrap());
        assert_eq!(cursor.obs_value().unwrap(), None);
        assert!(!cursor.next_obs().unwrap());
        assert!(!cursor.next_obs().unwrap());

        assert!(cursor.next_series().unwrap());
        assert_eq!(cursor.series_key().unwrap(), &Key::parse("M.FR.INDUSTRY"));
        assert!(!cursor.next_obs().unwrap());

        // Observations left unread are skipped
        assert!(cursor.next_series().unwrap());
        assert_eq!(cursor.series_key().unwrap(), &Key::parse("A.FR.RETAIL"));
        assert_eq!(cursor.series_frequency().unwrap(), Frequency::Annual);
        assert!(cursor.series_attributes().unwrap().is_empty());

        assert!(!cursor.next_series().unwrap());
        assert!(!cursor.next_series().unwrap());
        assert!(matches!(cursor.series_key(), Err(SdmxError::CursorState(_))));
        cursor.close().unwrap();
    }

    #[test]
    fn test_protocol_errors() {
        let mut cursor = open(SAMPLE);
        assert!(matches!(cursor.series_key(), Err(SdmxError::CursorState(_))));
        assert!(matches!(cursor.next_obs(), Err(SdmxError::CursorState(_))));

        cursor.next_series().unwrap();
        assert!(matches!(cursor.obs_period(), Err(SdmxError::CursorState(_))));
        assert!(matches!(
            cursor.series_attribute(""),
            Err(SdmxError::InvalidParameter(_))
        ));

        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert!(matches!(cursor.next_series(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.series_key(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.next_obs(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.obs_value(), Err(SdmxError::CursorClosed)));
    }

    #[test]
    fn test_invalid_value_is_a_parse_error() {
        let mut cursor = open("FREQ,TIME_PERIOD,OBS_VALUE\nM,2020-01,abc\n");
        assert!(cursor.next_series().unwrap());
        assert!(matches!(cursor.next_obs(), Err(SdmxError::Parse(_))));
    }

    #[test]
    fn test_materializes_into_data_set() {
        let mut cursor = open(SAMPLE);
        let data_set = DataSet::from_cursor(
            DataflowRef::parse("ECB,STS,1.0"),
            DataQuery::ALL,
            &mut cursor,
        )
        .unwrap();
        assert_eq!(data_set.len(), 3);
        let belgium = data_set.get_series(&Key::parse("M.BE.INDUSTRY")).unwrap();
        assert_eq!(belgium.obs().len(), 2);
        let retail = data_set.get_series(&Key::parse("A.FR.RETAIL")).unwrap();
        assert_eq!(retail.obs()[1].value, Some(5.0));
    }

    #[test]
    fn test_interleaved_rows_materialize_per_key() {
        let mut cursor = open(
            "FREQ,REF_AREA,TIME_PERIOD,OBS_VALUE,TITLE
             M,BE,2020-01,1,Belgium
             M,FR,2020-01,3,France
             M,BE,2020-02,2,
",
        );
        let data_set = DataSet::from_cursor(
            DataflowRef::parse("ECB,STS,1.0"),
            DataQuery::ALL,
            &mut cursor,
        )
        .unwrap();
        cursor.close().unwrap();

        assert_eq!(data_set.len(), 2);
        let belgium = data_set.get_series(&Key::parse("M.BE")).unwrap();
        assert_eq!(belgium.meta()["TITLE"], "Belgium");
        assert_eq!(
            belgium.obs().iter().map(|o| o.value).collect::<Vec<_>>(),
            [Some(1.0), Some(2.0)]
        );
    }
}
