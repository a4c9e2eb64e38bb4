//! Data queries: which series, and how much of each.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::key::Key;

/// How much of each selected series a query returns.
///
/// [`DataDetail::NoData`] and [`DataDetail::SeriesKeysOnly`] both ignore
/// observations; they differ in whether series attributes are included.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataDetail {
    /// Keys, attributes and observations.
    #[default]
    Full,
    /// Keys and observations, no attributes.
    DataOnly,
    /// Keys only.
    SeriesKeysOnly,
    /// Keys and attributes, no observations.
    NoData,
}

impl DataDetail {
    /// Returns true if observations are part of the result.
    #[must_use]
    pub const fn is_data_requested(&self) -> bool {
        matches!(self, Self::Full | Self::DataOnly)
    }

    /// Returns true if series attributes are part of the result.
    #[must_use]
    pub const fn is_meta_requested(&self) -> bool {
        matches!(self, Self::Full | Self::NoData)
    }

    /// Returns true if observations are left out of the result.
    #[must_use]
    pub const fn ignores_data(&self) -> bool {
        !self.is_data_requested()
    }

    /// Value of the SDMX REST `detail` parameter.
    #[must_use]
    pub const fn as_rest_param(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::DataOnly => "dataonly",
            Self::SeriesKeysOnly => "serieskeysonly",
            Self::NoData => "nodata",
        }
    }
}

impl fmt::Display for DataDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_rest_param())
    }
}

/// A key paired with a detail level.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataQuery {
    key: Key,
    detail: DataDetail,
}

impl DataQuery {
    /// The query selecting every series in full detail.
    pub const ALL: Self = Self {
        key: Key::ALL,
        detail: DataDetail::Full,
    };

    /// Creates a query.
    #[must_use]
    pub const fn of(key: Key, detail: DataDetail) -> Self {
        Self { key, detail }
    }

    /// Creates a full-detail query for a key.
    #[must_use]
    pub const fn of_key(key: Key) -> Self {
        Self::of(key, DataDetail::Full)
    }

    /// Returns the key of this query.
    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the detail level of this query.
    #[must_use]
    pub const fn detail(&self) -> DataDetail {
        self.detail
    }

    /// Returns true if this query places no constraint on the result.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.key.is_all() && self.detail == DataDetail::Full
    }

    /// Returns a copy of this query with another detail level.
    #[must_use]
    pub fn with_detail(&self, detail: DataDetail) -> Self {
        Self::of(self.key.clone(), detail)
    }
}

impl fmt::Display for DataQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?detail={}", self.key, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_levels() {
        assert!(DataDetail::Full.is_data_requested());
        assert!(DataDetail::Full.is_meta_requested());
        assert!(DataDetail::DataOnly.is_data_requested());
        assert!(!DataDetail::DataOnly.is_meta_requested());
        assert!(DataDetail::SeriesKeysOnly.ignores_data());
        assert!(!DataDetail::SeriesKeysOnly.is_meta_requested());
        assert!(DataDetail::NoData.ignores_data());
        assert!(DataDetail::NoData.is_meta_requested());
    }

    #[test]
    fn test_query_all() {
        assert!(DataQuery::ALL.is_all());
        assert!(!DataQuery::of(Key::ALL, DataDetail::NoData).is_all());
        assert!(!DataQuery::of_key(Key::parse("M.BE")).is_all());
        assert_eq!(
            DataQuery::of(Key::parse("M.BE"), DataDetail::SeriesKeysOnly).to_string(),
            "M.BE?detail=serieskeysonly"
        );
    }
}
