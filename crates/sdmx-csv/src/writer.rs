//! SDMX-CSV encoder.

use chrono::{Datelike, NaiveDateTime};
use csv::{Writer, WriterBuilder};
use sdmx_core::{
    DataCursor, DataDetail, DataSet, DataStructure, DataflowRef, Frequency, Result, SdmxError,
    Series, cursor::read_series, period::format_period,
};
use std::io::Write;

use crate::layout::{DATAFLOW_COLUMN, format_dataflow};
use crate::reader::csv_error;

/// Formats a period the way SDMX writes it for a frequency.
#[must_use]
pub fn format_period_for(period: &NaiveDateTime, freq: Frequency) -> String {
    let (year, month) = (period.year(), period.month());
    match freq {
        Frequency::Annual => format!("{year:04}"),
        Frequency::HalfYearly => format!("{year:04}-S{}", (month - 1) / 6 + 1),
        Frequency::Quarterly => format!("{year:04}-Q{}", (month - 1) / 3 + 1),
        Frequency::Monthly => format!("{year:04}-{month:02}"),
        Frequency::Weekly => {
            let week = period.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        _ => format_period(period),
    }
}

/// Writes series as SDMX-CSV rows.
///
/// The header is `DATAFLOW`, the dimensions in key order, the time
/// dimension, the primary measure and the attributes of the structure.
pub struct SdmxCsvWriter<W: Write> {
    writer: Writer<W>,
    flow: String,
    dimensions: usize,
    attributes: Vec<String>,
}

impl<W: Write> std::fmt::Debug for SdmxCsvWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdmxCsvWriter")
            .field("flow", &self.flow)
            .field("dimensions", &self.dimensions)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

impl<W: Write> SdmxCsvWriter<W> {
    /// Creates a writer and writes the header.
    ///
    /// # Errors
    /// Fails if the header cannot be written.
    pub fn new(inner: W, flow_ref: &DataflowRef, structure: &DataStructure) -> Result<Self> {
        let mut writer = WriterBuilder::new().from_writer(inner);
        let attributes: Vec<String> = structure.attributes().iter().map(|a| a.id.clone()).collect();

        let mut header = vec![DATAFLOW_COLUMN];
        header.extend(structure.dimension_ids());
        header.push(structure.time_dimension_id());
        header.push(structure.primary_measure_id());
        header.extend(attributes.iter().map(String::as_str));
        writer.write_record(&header).map_err(csv_error)?;

        Ok(Self {
            writer,
            flow: format_dataflow(flow_ref),
            dimensions: structure.dimensions().len(),
            attributes,
        })
    }

    /// Writes one series: one row per observation, or a single row without
    /// period nor value when it has none.
    ///
    /// # Errors
    /// Returns [`SdmxError::InvalidKey`] if the key does not have one code per
    /// dimension.
    pub fn write_series(&mut self, series: &Series) -> Result<()> {
        let key = series.key();
        if !key.is_series() || key.len() != self.dimensions {
            return Err(SdmxError::InvalidKey {
                key: key.to_string(),
                reason: format!("expected a series key of {} dimensions", self.dimensions),
            });
        }

        let mut row: Vec<String> = Vec::with_capacity(self.dimensions + 3 + self.attributes.len());
        row.push(self.flow.clone());
        row.extend(key.codes().iter().cloned());
        let fixed = row.len();
        let attributes = self
            .attributes
            .iter()
            .map(|id| series.meta().get(id).cloned().unwrap_or_default());

        if series.obs().is_empty() {
            row.extend([String::new(), String::new()]);
            row.extend(attributes);
            return self.writer.write_record(&row).map_err(csv_error);
        }

        let attributes: Vec<String> = attributes.collect();
        for obs in series.obs() {
            row.truncate(fixed);
            row.push(
                obs.period
                    .map(|p| format_period_for(&p, series.freq()))
                    .unwrap_or_default(),
            );
            row.push(obs.value.map(|v| v.to_string()).unwrap_or_default());
            row.extend(attributes.iter().cloned());
            self.writer.write_record(&row).map_err(csv_error)?;
        }
        Ok(())
    }

    /// Writes every series of a data set.
    pub fn write_data_set(&mut self, data_set: &DataSet) -> Result<()> {
        data_set.iter().try_for_each(|series| self.write_series(series))
    }

    /// Drains a cursor, leaving it open.
    pub fn write_cursor(&mut self, cursor: &mut dyn DataCursor) -> Result<()> {
        while cursor.next_series()? {
            let series = read_series(cursor, DataDetail::Full)?;
            self.write_series(&series)?;
        }
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| SdmxError::Io(e.into_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SdmxCsvCursor;
    use sdmx_core::{
        Attribute, DataQuery, DataStructureRef, Dimension, Key, Obs, period::parse_period,
    };
    use std::io::Cursor;

    fn structure() -> DataStructure {
        DataStructure::builder(DataStructureRef::parse("ECB,ECB_EXR1,1.0"))
            .dimension(Dimension::new("FREQ", 1))
            .dimension(Dimension::new("CURRENCY", 2))
            .attribute(Attribute::new("TITLE"))
            .build()
    }

    fn data_set() -> DataSet {
        DataSet::builder(DataflowRef::parse("ECB,EXR,1.0"))
            .series(
                Series::builder(Key::parse("Q.USD"))
                    .freq(Frequency::Quarterly)
                    .meta("TITLE", "Dollar, quarterly")
                    .obs(Obs::new(parse_period("2020-Q1"), Some(1.1)))
                    .obs(Obs::new(parse_period("2020-Q2"), None))
                    .build(),
            )
            .series(Series::builder(Key::parse("M.CHF")).freq(Frequency::Monthly).build())
            .build()
            .unwrap()
    }

    #[test]
    fn test_format_period_for() {
        let p = parse_period("2020-05-17").unwrap();
        assert_eq!(format_period_for(&p, Frequency::Annual), "2020");
        assert_eq!(format_period_for(&p, Frequency::HalfYearly), "2020-S1");
        assert_eq!(format_period_for(&p, Frequency::Quarterly), "2020-Q2");
        assert_eq!(format_period_for(&p, Frequency::Monthly), "2020-05");
        assert_eq!(format_period_for(&p, Frequency::Weekly), "2020-W20");
        assert_eq!(format_period_for(&p, Frequency::Daily), "2020-05-17");
    }

    #[test]
    fn test_writes_rows() {
        let mut writer = SdmxCsvWriter::new(Vec::new(), &DataflowRef::parse("ECB,EXR,1.0"), &structure())
            .unwrap();
        writer.write_data_set(&data_set()).unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            text,
            "DATAFLOW,FREQ,CURRENCY,TIME_PERIOD,OBS_VALUE,TITLE\n\
             ECB:EXR(1.0),Q,USD,2020-Q1,1.1,\"Dollar, quarterly\"\n\
             ECB:EXR(1.0),Q,USD,2020-Q2,,\"Dollar, quarterly\"\n\
             ECB:EXR(1.0),M,CHF,,,\n"
        );
    }

    #[test]
    fn test_rejects_partial_keys() {
        let mut writer =
            SdmxCsvWriter::new(Vec::new(), &DataflowRef::parse("EXR"), &structure()).unwrap();
        let series = Series::builder(Key::parse("M.")).build();
        assert!(matches!(
            writer.write_series(&series),
            Err(SdmxError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_decodes_what_it_encodes() {
        let original = data_set();
        let mut writer =
            SdmxCsvWriter::new(Vec::new(), original.flow_ref(), &structure()).unwrap();
        writer.write_data_set(&original).unwrap();
        let bytes = writer.finish().unwrap();

        let mut cursor = SdmxCsvCursor::new(Cursor::new(bytes), &structure()).unwrap();
        let decoded =
            DataSet::from_cursor(original.flow_ref().clone(), DataQuery::ALL, &mut cursor).unwrap();
        cursor.close().unwrap();
        assert_eq!(decoded, original);
    }
}
