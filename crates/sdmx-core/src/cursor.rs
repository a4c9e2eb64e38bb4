//! The data cursor protocol.
//!
//! A [`DataCursor`] is a single-pass, forward-only reader with two nested
//! levels: series (key, frequency, attributes) and observations (period,
//! value). Every format decoder and every client produces one.
//!
//! A cursor moves through the states of [`CursorState`]:
//!
//! ```text
//! BeforeFirstSeries -> InSeries(BeforeFirstObs -> InObs -> AfterLastObs) -> AfterLastSeries
//!        \____________________________ close() ___________________________/-> Closed
//! ```
//!
//! Accessors called outside of their state fail with
//! [`SdmxError::CursorState`]; anything but `close()` called after close
//! fails with [`SdmxError::CursorClosed`]. `close()` is idempotent.
//!
//! Cursors are not meant to be shared between threads: state changes take
//! `&mut self`.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::iter::FusedIterator;

use crate::error::{Result, SdmxError};
use crate::frequency::Frequency;
use crate::key::Key;
use crate::query::{DataDetail, DataQuery};
use crate::series::{Obs, Series};

static NO_ATTRIBUTES: BTreeMap<String, String> = BTreeMap::new();

/// Single-pass reader over series and their observations.
pub trait DataCursor: Send + Debug {
    /// Advances to the next series.
    ///
    /// Returns `false` once the series are exhausted, and keeps returning
    /// `false` on later calls.
    fn next_series(&mut self) -> Result<bool>;

    /// Returns the key of the current series.
    fn series_key(&self) -> Result<&Key>;

    /// Returns the frequency of the current series.
    fn series_frequency(&self) -> Result<Frequency>;

    /// Returns one attribute of the current series.
    ///
    /// # Errors
    /// Fails with [`SdmxError::InvalidParameter`] on an empty name.
    fn series_attribute(&self, name: &str) -> Result<Option<&str>>;

    /// Returns every attribute of the current series.
    fn series_attributes(&self) -> Result<&BTreeMap<String, String>>;

    /// Advances to the next observation of the current series.
    fn next_obs(&mut self) -> Result<bool>;

    /// Returns the period of the current observation.
    fn obs_period(&self) -> Result<Option<NaiveDateTime>>;

    /// Returns the value of the current observation.
    fn obs_value(&self) -> Result<Option<f64>>;

    /// Releases the underlying resource. Calling it again has no effect.
    fn close(&mut self) -> Result<()>;

    /// Returns true once `close()` has been called.
    fn is_closed(&self) -> bool;
}

/// Position of a cursor in the series level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorState {
    /// `next_series()` has not been called yet.
    #[default]
    BeforeFirstSeries,
    /// A series is current.
    InSeries(ObsState),
    /// Series are exhausted.
    AfterLastSeries,
    /// The cursor has been closed.
    Closed,
}

/// Position of a cursor in the observation level of the current series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObsState {
    /// `next_obs()` has not been called yet.
    BeforeFirstObs,
    /// An observation is current.
    InObs,
    /// Observations are exhausted.
    AfterLastObs,
}

impl CursorState {
    /// Fails if the cursor is closed.
    pub fn check_open(self) -> Result<()> {
        match self {
            Self::Closed => Err(SdmxError::CursorClosed),
            _ => Ok(()),
        }
    }

    /// Fails unless a series is current.
    pub fn check_series(self) -> Result<()> {
        match self {
            Self::InSeries(_) => Ok(()),
            Self::Closed => Err(SdmxError::CursorClosed),
            Self::BeforeFirstSeries => Err(SdmxError::cursor_state(
                "no current series, next_series() was not called",
            )),
            Self::AfterLastSeries => Err(SdmxError::cursor_state(
                "no current series, series are exhausted",
            )),
        }
    }

    /// Fails unless an observation is current.
    pub fn check_obs(self) -> Result<()> {
        match self {
            Self::InSeries(ObsState::InObs) => Ok(()),
            Self::InSeries(ObsState::BeforeFirstObs) => Err(SdmxError::cursor_state(
                "no current observation, next_obs() was not called",
            )),
            Self::InSeries(ObsState::AfterLastObs) => Err(SdmxError::cursor_state(
                "no current observation, observations are exhausted",
            )),
            other => other.check_series(),
        }
    }

    /// Returns true once the cursor is closed.
    #[must_use]
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

/// Rejects an empty attribute name.
pub fn check_attribute_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SdmxError::InvalidParameter(
            "attribute name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Reads the current series of a cursor, consuming its observations when
/// `detail` requests data.
pub fn read_series(cursor: &mut dyn DataCursor, detail: DataDetail) -> Result<Series> {
    let mut builder = Series::builder(cursor.series_key()?.clone()).freq(cursor.series_frequency()?);
    if detail.is_meta_requested() {
        builder = builder.metas(cursor.series_attributes()?.clone());
    }
    if detail.is_data_requested() {
        while cursor.next_obs()? {
            builder.push_obs(Obs::new(cursor.obs_period()?, cursor.obs_value()?));
        }
    }
    Ok(builder.build())
}

/// Cursor over series held in memory.
#[derive(Debug)]
pub struct SeriesCursor {
    series: std::vec::IntoIter<Series>,
    current: Option<Series>,
    obs_index: usize,
    state: CursorState,
}

impl SeriesCursor {
    /// Creates a cursor over the given series.
    #[must_use]
    pub fn new(series: Vec<Series>) -> Self {
        Self {
            series: series.into_iter(),
            current: None,
            obs_index: 0,
            state: CursorState::BeforeFirstSeries,
        }
    }

    /// Creates a cursor without any series.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn current(&self) -> Result<&Series> {
        self.state.check_series()?;
        self.current
            .as_ref()
            .ok_or_else(|| SdmxError::cursor_state("no current series"))
    }

    fn current_obs(&self) -> Result<&Obs> {
        self.state.check_obs()?;
        self.current()?
            .obs()
            .get(self.obs_index)
            .ok_or_else(|| SdmxError::cursor_state("no current observation"))
    }
}

impl DataCursor for SeriesCursor {
    fn next_series(&mut self) -> Result<bool> {
        self.state.check_open()?;
        if self.state == CursorState::AfterLastSeries {
            return Ok(false);
        }
        self.current = self.series.next();
        self.obs_index = 0;
        if self.current.is_some() {
            self.state = CursorState::InSeries(ObsState::BeforeFirstObs);
            Ok(true)
        } else {
            self.state = CursorState::AfterLastSeries;
            Ok(false)
        }
    }

    fn series_key(&self) -> Result<&Key> {
        Ok(self.current()?.key())
    }

    fn series_frequency(&self) -> Result<Frequency> {
        Ok(self.current()?.freq())
    }

    fn series_attribute(&self, name: &str) -> Result<Option<&str>> {
        check_attribute_name(name)?;
        Ok(self.current()?.meta().get(name).map(String::as_str))
    }

    fn series_attributes(&self) -> Result<&BTreeMap<String, String>> {
        Ok(self.current()?.meta())
    }

    fn next_obs(&mut self) -> Result<bool> {
        self.state.check_series()?;
        let count = self.current()?.obs().len();
        let next = match self.state {
            CursorState::InSeries(ObsState::BeforeFirstObs) => 0,
            CursorState::InSeries(ObsState::InObs) => self.obs_index + 1,
            _ => return Ok(false),
        };
        if next < count {
            self.obs_index = next;
            self.state = CursorState::InSeries(ObsState::InObs);
            Ok(true)
        } else {
            self.state = CursorState::InSeries(ObsState::AfterLastObs);
            Ok(false)
        }
    }

    fn obs_period(&self) -> Result<Option<NaiveDateTime>> {
        Ok(self.current_obs()?.period)
    }

    fn obs_value(&self) -> Result<Option<f64>> {
        Ok(self.current_obs()?.value)
    }

    fn close(&mut self) -> Result<()> {
        if !self.state.is_closed() {
            self.state = CursorState::Closed;
            self.current = None;
            self.series = Vec::new().into_iter();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

/// Cursor adapter applying the key and detail of a query to another cursor.
///
/// Series whose key is not contained in the query key are skipped,
/// observations are hidden when the detail ignores data and attributes are
/// hidden when it ignores meta.
#[derive(Debug)]
pub struct FilteredCursor {
    inner: Box<dyn DataCursor>,
    query: DataQuery,
}

impl FilteredCursor {
    /// Wraps a cursor.
    #[must_use]
    pub fn new(inner: Box<dyn DataCursor>, query: DataQuery) -> Self {
        Self { inner, query }
    }

    /// Wraps a cursor unless the query places no constraint on it.
    #[must_use]
    pub fn wrap(inner: Box<dyn DataCursor>, query: &DataQuery) -> Box<dyn DataCursor> {
        if query.is_all() {
            inner
        } else {
            Box::new(Self::new(inner, query.clone()))
        }
    }
}

impl DataCursor for FilteredCursor {
    fn next_series(&mut self) -> Result<bool> {
        while self.inner.next_series()? {
            if self.query.key().contains(self.inner.series_key()?) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn series_key(&self) -> Result<&Key> {
        self.inner.series_key()
    }

    fn series_frequency(&self) -> Result<Frequency> {
        self.inner.series_frequency()
    }

    fn series_attribute(&self, name: &str) -> Result<Option<&str>> {
        check_attribute_name(name)?;
        if self.query.detail().is_meta_requested() {
            self.inner.series_attribute(name)
        } else {
            self.inner.series_key()?;
            Ok(None)
        }
    }

    fn series_attributes(&self) -> Result<&BTreeMap<String, String>> {
        if self.query.detail().is_meta_requested() {
            self.inner.series_attributes()
        } else {
            self.inner.series_key()?;
            Ok(&NO_ATTRIBUTES)
        }
    }

    fn next_obs(&mut self) -> Result<bool> {
        if self.query.detail().is_data_requested() {
            self.inner.next_obs()
        } else {
            self.inner.series_key()?;
            Ok(false)
        }
    }

    fn obs_period(&self) -> Result<Option<NaiveDateTime>> {
        self.inner.obs_period()
    }

    fn obs_value(&self) -> Result<Option<f64>> {
        self.inner.obs_value()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Lazy, single-pass sequence of the series of a cursor.
///
/// The cursor is closed when the sequence is exhausted, fails, is closed
/// explicitly or is dropped. The sequence cannot be restarted.
#[derive(Debug)]
pub struct SeriesIter {
    cursor: Option<Box<dyn DataCursor>>,
    detail: DataDetail,
}

impl SeriesIter {
    /// Creates a sequence reading each series with the given detail.
    #[must_use]
    pub fn new(cursor: Box<dyn DataCursor>, detail: DataDetail) -> Self {
        Self {
            cursor: Some(cursor),
            detail,
        }
    }

    /// Closes the underlying cursor.
    pub fn close(&mut self) -> Result<()> {
        match self.cursor.take() {
            Some(mut cursor) => cursor.close(),
            None => Ok(()),
        }
    }

    fn read_next(cursor: &mut dyn DataCursor, detail: DataDetail) -> Result<Option<Series>> {
        if cursor.next_series()? {
            read_series(cursor, detail).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl Iterator for SeriesIter {
    type Item = Result<Series>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match Self::read_next(cursor.as_mut(), self.detail) {
            Ok(Some(series)) => Some(Ok(series)),
            Ok(None) => match self.close() {
                Ok(()) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => {
                let _ = self.close();
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for SeriesIter {}

impl Drop for SeriesIter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::parse_period;

    fn sample() -> Vec<Series> {
        vec![
            Series::builder(Key::parse("M.BE"))
                .freq(Frequency::Monthly)
                .meta("TITLE", "Belgium")
                .obs(Obs::new(parse_period("2020-01"), Some(1.0)))
                .obs(Obs::new(parse_period("2020-02"), None))
                .build(),
            Series::builder(Key::parse("M.FR"))
                .freq(Frequency::Monthly)
                .meta("TITLE", "France")
                .obs(Obs::new(parse_period("2020-01"), Some(3.0)))
                .build(),
        ]
    }

    #[test]
    fn test_protocol_ordering() {
        let mut cursor = SeriesCursor::new(sample());

        assert!(matches!(cursor.series_key(), Err(SdmxError::CursorState(_))));
        assert!(matches!(cursor.obs_period(), Err(SdmxError::CursorState(_))));
        assert!(matches!(cursor.next_obs(), Err(SdmxError::CursorState(_))));

        assert!(cursor.next_series().unwrap());
        assert_eq!(cursor.series_key().unwrap(), &Key::parse("M.BE"));
        assert_eq!(cursor.series_attribute("TITLE").unwrap(), Some("Belgium"));
        assert_eq!(cursor.series_attribute("MISSING").unwrap(), None);
        assert!(matches!(cursor.obs_value(), Err(SdmxError::CursorState(_))));

        assert!(cursor.next_obs().unwrap());
        assert_eq!(cursor.obs_value().unwrap(), Some(1.0));
        assert!(cursor.next_obs().unwrap());
        assert_eq!(cursor.obs_value().unwrap(), None);
        assert!(!cursor.next_obs().unwrap());
        assert!(!cursor.next_obs().unwrap());
        assert!(matches!(cursor.obs_period(), Err(SdmxError::CursorState(_))));

        assert!(cursor.next_series().unwrap());
        assert_eq!(cursor.series_key().unwrap(), &Key::parse("M.FR"));

        assert!(!cursor.next_series().unwrap());
        assert!(matches!(cursor.series_key(), Err(SdmxError::CursorState(_))));
        assert!(matches!(cursor.series_attributes(), Err(SdmxError::CursorState(_))));
        assert!(matches!(cursor.next_obs(), Err(SdmxError::CursorState(_))));
        assert!(!cursor.next_series().unwrap());
        assert!(!cursor.next_series().unwrap());
    }

    #[test]
    fn test_empty_attribute_name_rejected() {
        let mut cursor = SeriesCursor::new(sample());
        cursor.next_series().unwrap();
        assert!(matches!(
            cursor.series_attribute(""),
            Err(SdmxError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let mut cursor = SeriesCursor::new(sample());
        cursor.next_series().unwrap();
        for _ in 0..3 {
            assert!(cursor.close().is_ok());
        }
        assert!(cursor.is_closed());
        assert!(matches!(cursor.next_series(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.series_key(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.series_frequency(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.series_attribute("TITLE"), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.series_attributes(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.next_obs(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.obs_period(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.obs_value(), Err(SdmxError::CursorClosed)));
    }

    #[test]
    fn test_filtered_cursor() {
        let query = DataQuery::of(Key::parse("M.FR"), DataDetail::SeriesKeysOnly);
        let mut cursor = FilteredCursor::new(Box::new(SeriesCursor::new(sample())), query);

        assert!(cursor.next_series().unwrap());
        assert_eq!(cursor.series_key().unwrap(), &Key::parse("M.FR"));
        assert!(cursor.series_attributes().unwrap().is_empty());
        assert_eq!(cursor.series_attribute("TITLE").unwrap(), None);
        assert!(!cursor.next_obs().unwrap());
        assert!(!cursor.next_series().unwrap());
        assert!(matches!(cursor.series_attributes(), Err(SdmxError::CursorState(_))));

        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(matches!(cursor.next_series(), Err(SdmxError::CursorClosed)));
    }

    #[test]
    fn test_series_iter_reads_and_closes() {
        let mut iter = SeriesIter::new(Box::new(SeriesCursor::new(sample())), DataDetail::NoData);
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.key(), &Key::parse("M.BE"));
        assert!(first.obs().is_empty());
        assert_eq!(first.meta().len(), 1);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_series_iter_collects_full() {
        let series: Result<Vec<Series>> =
            SeriesIter::new(Box::new(SeriesCursor::new(sample())), DataDetail::Full).collect();
        assert_eq!(series.unwrap(), sample());
    }
}
