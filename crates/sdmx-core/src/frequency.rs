//! Series frequency definitions.
//!
//! This module defines [`Frequency`], the sampling frequency of an SDMX series
//! as carried by the conventional `FREQ` dimension or attribute.

use serde::{Deserialize, Serialize};

/// Frequency of the observations of a series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Yearly observations (`A`).
    Annual,
    /// Half-yearly observations (`S`).
    HalfYearly,
    /// Quarterly observations (`Q`).
    Quarterly,
    /// Monthly observations (`M`).
    Monthly,
    /// Weekly observations (`W`).
    Weekly,
    /// Daily observations (`D`, or `B` for business days).
    Daily,
    /// Hourly observations (`H`).
    Hourly,
    /// Minutely observations (`N`).
    Minutely,
    /// Unknown or irregular frequency.
    #[default]
    Undefined,
}

impl Frequency {
    /// Conventional id of the dimension or attribute that carries the frequency.
    pub const DIMENSION_ID: &'static str = "FREQ";

    /// Parses an SDMX frequency code (`A`, `S`, `Q`, `M`, `W`, `D`, `B`, `H`, `N`).
    ///
    /// Unknown codes map to [`Frequency::Undefined`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "A" => Self::Annual,
            "S" | "H2" => Self::HalfYearly,
            "Q" => Self::Quarterly,
            "M" => Self::Monthly,
            "W" => Self::Weekly,
            "D" | "B" => Self::Daily,
            "H" => Self::Hourly,
            "N" => Self::Minutely,
            _ => Self::Undefined,
        }
    }

    /// Returns the SDMX code of this frequency, `None` when undefined.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Annual => Some("A"),
            Self::HalfYearly => Some("S"),
            Self::Quarterly => Some("Q"),
            Self::Monthly => Some("M"),
            Self::Weekly => Some("W"),
            Self::Daily => Some("D"),
            Self::Hourly => Some("H"),
            Self::Minutely => Some("N"),
            Self::Undefined => None,
        }
    }

    /// Returns true if this is an intraday frequency (hourly or minutely).
    #[must_use]
    pub const fn is_intraday(&self) -> bool {
        matches!(self, Self::Hourly | Self::Minutely)
    }
}
