//! In-memory data sets.
//!
//! A [`DataSet`] materializes a cursor into a collection of [`Series`]
//! addressable by key. It owns no external resource and can be turned back
//! into a cursor, so cached and freshly fetched data are consumed the same
//! way.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

use crate::cursor::{DataCursor, SeriesCursor, read_series};
use crate::error::{Result, SdmxError};
use crate::key::Key;
use crate::period::format_period;
use crate::query::DataQuery;
use crate::series::Series;
use crate::types::DataflowRef;

/// Series of one dataflow, unique by key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DataSetParts")]
pub struct DataSet {
    flow_ref: DataflowRef,
    query: DataQuery,
    series: Vec<Series>,
    #[serde(skip_serializing)]
    index: HashMap<Key, usize>,
}

#[derive(Deserialize)]
struct DataSetParts {
    flow_ref: DataflowRef,
    query: DataQuery,
    series: Vec<Series>,
}

impl TryFrom<DataSetParts> for DataSet {
    type Error = SdmxError;

    fn try_from(parts: DataSetParts) -> Result<Self> {
        Self::new(parts.flow_ref, parts.query, parts.series)
    }
}

impl DataSet {
    /// Creates a data set.
    ///
    /// # Errors
    /// Returns [`SdmxError::InvalidParameter`] if two series share a key.
    pub fn new(flow_ref: DataflowRef, query: DataQuery, series: Vec<Series>) -> Result<Self> {
        let mut index = HashMap::with_capacity(series.len());
        for (position, s) in series.iter().enumerate() {
            if index.insert(s.key().clone(), position).is_some() {
                return Err(SdmxError::InvalidParameter(format!(
                    "duplicate series key '{}' in '{flow_ref}'",
                    s.key()
                )));
            }
        }
        Ok(Self {
            flow_ref,
            query,
            series,
            index,
        })
    }

    /// Returns a builder for a data set.
    #[must_use]
    pub fn builder(flow_ref: DataflowRef) -> DataSetBuilder {
        DataSetBuilder {
            flow_ref,
            query: DataQuery::ALL,
            series: Vec::new(),
        }
    }

    /// Reads every series of a cursor, with the key and detail of `query`.
    ///
    /// Rows of a series need not be contiguous in the source, so a key met
    /// again is merged into the series first read under it.
    /// The cursor is left open; closing it is the caller's business.
    pub fn from_cursor(
        flow_ref: DataflowRef,
        query: DataQuery,
        cursor: &mut dyn DataCursor,
    ) -> Result<Self> {
        let mut series: Vec<Series> = Vec::new();
        let mut index: HashMap<Key, usize> = HashMap::new();
        while cursor.next_series()? {
            if !query.key().contains(cursor.series_key()?) {
                continue;
            }
            let next = read_series(cursor, query.detail())?;
            match index.get(next.key()) {
                Some(&position) => series[position].absorb(next),
                None => {
                    index.insert(next.key().clone(), series.len());
                    series.push(next);
                }
            }
        }
        Ok(Self {
            flow_ref,
            query,
            series,
            index,
        })
    }

    /// Returns the dataflow of this data set.
    #[must_use]
    pub const fn flow_ref(&self) -> &DataflowRef {
        &self.flow_ref
    }

    /// Returns the query this data set answers.
    #[must_use]
    pub const fn query(&self) -> &DataQuery {
        &self.query
    }

    /// Returns the number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns true if there is no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Returns an iterator over the series.
    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    /// Returns the series of a given key.
    #[must_use]
    pub fn get_series(&self, key: &Key) -> Option<&Series> {
        self.index.get(key).map(|&position| &self.series[position])
    }

    /// Returns the series selected by a query.
    ///
    /// An unconstrained query borrows the stored series as they are; any
    /// other query yields copies filtered by key and stripped per detail.
    #[must_use]
    pub fn get_data(&self, query: &DataQuery) -> Cow<'_, [Series]> {
        if query.is_all() {
            return Cow::Borrowed(&self.series);
        }
        Cow::Owned(
            self.series
                .iter()
                .filter(|s| query.key().contains(s.key()))
                .map(|s| s.with_detail(query.detail()))
                .collect(),
        )
    }

    /// Returns a cursor over the series selected by a query.
    #[must_use]
    pub fn get_data_cursor(&self, query: &DataQuery) -> Box<dyn DataCursor> {
        Box::new(SeriesCursor::new(self.get_data(query).into_owned()))
    }

    /// Consumes the data set into its series.
    #[must_use]
    pub fn into_series(self) -> Vec<Series> {
        self.series
    }

    /// Flattens the observations into a `DataFrame` with `series`, `period`
    /// (datetime), `period_label` (SDMX period text) and `value` columns.
    ///
    /// # Errors
    /// Returns [`SdmxError::Other`] if the frame cannot be assembled.
    pub fn to_data_frame(&self) -> Result<DataFrame> {
        let rows: usize = self.series.iter().map(|s| s.obs().len()).sum();
        let mut keys: Vec<String> = Vec::with_capacity(rows);
        let mut periods: Vec<Option<i64>> = Vec::with_capacity(rows);
        let mut labels: Vec<Option<String>> = Vec::with_capacity(rows);
        let mut values: Vec<Option<f64>> = Vec::with_capacity(rows);

        for series in &self.series {
            let key = series.key().to_string();
            for obs in series.obs() {
                keys.push(key.clone());
                periods.push(obs.period.map(|p| p.and_utc().timestamp_millis()));
                labels.push(obs.period.as_ref().map(format_period));
                values.push(obs.value);
            }
        }

        let period_col = Column::new("period".into(), periods)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| SdmxError::Other(e.to_string()))?;

        DataFrame::new(vec![
            Column::new("series".into(), keys),
            period_col,
            Column::new("period_label".into(), labels),
            Column::new("value".into(), values),
        ])
        .map_err(|e| SdmxError::Other(e.to_string()))
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a Series;
    type IntoIter = std::slice::Iter<'a, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}

/// Builder for [`DataSet`] validating key uniqueness at [`DataSetBuilder::build`].
#[derive(Clone, Debug)]
pub struct DataSetBuilder {
    flow_ref: DataflowRef,
    query: DataQuery,
    series: Vec<Series>,
}

impl DataSetBuilder {
    /// Sets the query the data set answers.
    #[must_use]
    pub fn query(mut self, query: DataQuery) -> Self {
        self.query = query;
        self
    }

    /// Adds a series.
    #[must_use]
    pub fn series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    /// Adds several series.
    #[must_use]
    pub fn all_series(mut self, series: impl IntoIterator<Item = Series>) -> Self {
        self.series.extend(series);
        self
    }

    /// Builds the data set.
    ///
    /// # Errors
    /// Returns [`SdmxError::InvalidParameter`] if two series share a key.
    pub fn build(self) -> Result<DataSet> {
        DataSet::new(self.flow_ref, self.query, self.series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::Frequency;
    use crate::period::parse_period;
    use crate::query::DataDetail;
    use crate::series::Obs;

    fn sample() -> DataSet {
        DataSet::builder(DataflowRef::parse("ECB,EXR,1.0"))
            .series(
                Series::builder(Key::parse("M.BE.INDUSTRY"))
                    .freq(Frequency::Monthly)
                    .meta("TITLE", "Belgium")
                    .obs(Obs::new(parse_period("2020-01"), Some(1.0)))
                    .obs(Obs::new(parse_period("2020-02"), Some(2.0)))
                    .build(),
            )
            .series(
                Series::builder(Key::parse("M.FR.INDUSTRY"))
                    .freq(Frequency::Monthly)
                    .meta("TITLE", "France")
                    .obs(Obs::new(parse_period("2020-01"), None))
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_unconstrained_query_borrows_storage() {
        let data_set = sample();
        let data = data_set.get_data(&DataQuery::ALL);
        assert!(matches!(data, Cow::Borrowed(_)));
        assert!(std::ptr::eq(data.as_ref(), data_set.series.as_slice()));
    }

    #[test]
    fn test_get_data_filters_and_strips() {
        let data_set = sample();
        let query = DataQuery::of(Key::parse("M.FR.INDUSTRY"), DataDetail::SeriesKeysOnly);
        let data = data_set.get_data(&query);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].key(), &Key::parse("M.FR.INDUSTRY"));
        assert!(data[0].obs().is_empty());
        assert!(data[0].meta().is_empty());

        let detail_only = DataQuery::of(Key::ALL, DataDetail::NoData);
        let data = data_set.get_data(&detail_only);
        assert_eq!(data.len(), 2);
        assert!(data.iter().all(|s| s.obs().is_empty() && !s.meta().is_empty()));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let series = Series::builder(Key::parse("M.BE")).build();
        let result = DataSet::builder(DataflowRef::parse("EXR"))
            .series(series.clone())
            .series(series)
            .build();
        assert!(matches!(result, Err(SdmxError::InvalidParameter(_))));
    }

    #[test]
    fn test_cursor_round_trip() {
        let data_set = sample();
        let mut cursor = data_set.get_data_cursor(&DataQuery::ALL);
        let copy = DataSet::from_cursor(
            data_set.flow_ref().clone(),
            DataQuery::ALL,
            cursor.as_mut(),
        )
        .unwrap();
        cursor.close().unwrap();
        assert_eq!(copy, data_set);
    }

    #[test]
    fn test_from_cursor_applies_query() {
        let data_set = sample();
        let mut cursor = data_set.get_data_cursor(&DataQuery::ALL);
        let query = DataQuery::of(Key::parse("M.BE.INDUSTRY"), DataDetail::NoData);
        let filtered =
            DataSet::from_cursor(data_set.flow_ref().clone(), query.clone(), cursor.as_mut())
                .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.query(), &query);
        let series = filtered.get_series(&Key::parse("M.BE.INDUSTRY")).unwrap();
        assert!(series.obs().is_empty());
        assert_eq!(series.meta().len(), 1);
    }

    #[test]
    fn test_serde_round_trip_rebuilds_index() {
        let data_set = sample();
        let json = serde_json::to_string(&data_set).unwrap();
        let back: DataSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data_set);
        assert!(back.get_series(&Key::parse("M.FR.INDUSTRY")).is_some());
    }

    #[test]
    fn test_to_data_frame() {
        let df = sample().to_data_frame().unwrap();
        assert_eq!(df.height(), 3);
        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["series", "period", "period_label", "value"]);
    }

    #[test]
    fn test_from_cursor_merges_split_series() {
        let chunk = |key: &str, title: &str, period: &str, value: f64| {
            Series::builder(Key::parse(key))
                .meta("TITLE", title)
                .obs(Obs::new(parse_period(period), Some(value)))
                .build()
        };
        let mut cursor = SeriesCursor::new(vec![
            chunk("M.BE", "first", "2020-01", 1.0),
            chunk("M.FR", "France", "2020-01", 3.0),
            chunk("M.BE", "second", "2020-02", 2.0),
        ]);
        let data_set =
            DataSet::from_cursor(DataflowRef::parse("EXR"), DataQuery::ALL, &mut cursor).unwrap();
        cursor.close().unwrap();

        assert_eq!(data_set.len(), 2);
        let be = data_set.get_series(&Key::parse("M.BE")).unwrap();
        assert_eq!(be.meta()["TITLE"], "first");
        assert_eq!(
            be.obs().iter().map(|o| o.value).collect::<Vec<_>>(),
            [Some(1.0), Some(2.0)]
        );
        assert_eq!(data_set.iter().nth(1).unwrap().key(), &Key::parse("M.FR"));
    }
}
