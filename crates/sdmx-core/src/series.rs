//! Series and observations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::frequency::Frequency;
use crate::key::Key;
use crate::query::DataDetail;

/// A single observation of a series.
///
/// The period is missing for malformed records; the value is missing for
/// observations reported without a value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    /// Start of the observation period.
    pub period: Option<NaiveDateTime>,
    /// Observed value.
    pub value: Option<f64>,
}

impl Obs {
    /// Creates an observation.
    #[must_use]
    pub const fn new(period: Option<NaiveDateTime>, value: Option<f64>) -> Self {
        Self { period, value }
    }
}

/// One key-addressed time series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Series {
    key: Key,
    freq: Frequency,
    meta: BTreeMap<String, String>,
    obs: Vec<Obs>,
}

impl Series {
    /// Returns a builder for a series.
    #[must_use]
    pub fn builder(key: Key) -> SeriesBuilder {
        SeriesBuilder {
            series: Self {
                key,
                freq: Frequency::Undefined,
                meta: BTreeMap::new(),
                obs: Vec::new(),
            },
        }
    }

    /// Returns the key of this series.
    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the frequency of this series.
    #[must_use]
    pub const fn freq(&self) -> Frequency {
        self.freq
    }

    /// Returns the series attributes.
    #[must_use]
    pub const fn meta(&self) -> &BTreeMap<String, String> {
        &self.meta
    }

    /// Returns the observations in reporting order.
    #[must_use]
    pub fn obs(&self) -> &[Obs] {
        &self.obs
    }

    /// Returns a copy stripped of what `detail` leaves out.
    #[must_use]
    pub fn with_detail(&self, detail: DataDetail) -> Self {
        Self {
            key: self.key.clone(),
            freq: self.freq,
            meta: if detail.is_meta_requested() {
                self.meta.clone()
            } else {
                BTreeMap::new()
            },
            obs: if detail.is_data_requested() {
                self.obs.clone()
            } else {
                Vec::new()
            },
        }
    }

    /// Appends the observations of a later chunk of the same series.
    /// Attributes already set win over the chunk's.
    pub(crate) fn absorb(&mut self, chunk: Self) {
        if self.freq == Frequency::Undefined {
            self.freq = chunk.freq;
        }
        for (name, value) in chunk.meta {
            self.meta.entry(name).or_insert(value);
        }
        self.obs.extend(chunk.obs);
    }
}

/// Incremental construction of a [`Series`] while decoding a cursor.
#[derive(Clone, Debug)]
pub struct SeriesBuilder {
    series: Series,
}

impl SeriesBuilder {
    /// Sets the frequency.
    #[must_use]
    pub fn freq(mut self, freq: Frequency) -> Self {
        self.series.freq = freq;
        self
    }

    /// Sets one attribute.
    #[must_use]
    pub fn meta(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.series.meta.insert(name.into(), value.into());
        self
    }

    /// Sets every attribute at once.
    #[must_use]
    pub fn metas(mut self, meta: BTreeMap<String, String>) -> Self {
        self.series.meta = meta;
        self
    }

    /// Appends an observation.
    #[must_use]
    pub fn obs(mut self, obs: Obs) -> Self {
        self.series.obs.push(obs);
        self
    }

    /// Appends an observation in place.
    pub fn push_obs(&mut self, obs: Obs) {
        self.series.obs.push(obs);
    }

    /// Builds the series.
    #[must_use]
    pub fn build(self) -> Series {
        self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::parse_period;

    #[test]
    fn test_with_detail_strips_fields() {
        let series = Series::builder(Key::parse("M.BE"))
            .freq(Frequency::Monthly)
            .meta("TITLE", "Belgium")
            .obs(Obs::new(parse_period("2020-01"), Some(1.0)))
            .obs(Obs::new(None, None))
            .build();

        assert_eq!(series.with_detail(DataDetail::Full), series);

        let no_data = series.with_detail(DataDetail::NoData);
        assert!(no_data.obs().is_empty());
        assert_eq!(no_data.meta().get("TITLE").map(String::as_str), Some("Belgium"));

        let keys_only = series.with_detail(DataDetail::SeriesKeysOnly);
        assert!(keys_only.obs().is_empty());
        assert!(keys_only.meta().is_empty());
        assert_eq!(keys_only.freq(), Frequency::Monthly);

        let data_only = series.with_detail(DataDetail::DataOnly);
        assert_eq!(data_only.obs().len(), 2);
        assert!(data_only.meta().is_empty());
    }
}
