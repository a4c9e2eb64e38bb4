//! Multi-dimensional series keys.
//!
//! A [`Key`] selects series by giving one code per dimension of a data
//! structure. An empty code is a wildcard and `+` separates alternative codes
//! within a position, so `M..EUR+USD` selects monthly series of every country
//! in euro or dollar. [`Key::ALL`] selects everything regardless of the
//! dimensionality of the structure.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SdmxError};
use crate::types::DataStructure;

const SEPARATOR: char = '.';
const OR: char = '+';
const ALL_KEYWORD: &str = "all";

/// An ordered sequence of dimension codes, possibly containing wildcards.
///
/// Keys are immutable value types; equality and hashing are structural.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "Vec<String>", from = "Vec<String>")]
pub struct Key {
    codes: Vec<String>,
}

impl Key {
    /// Code used to mark a wildcard position.
    pub const WILDCARD: &'static str = "";

    /// The key that matches every series.
    pub const ALL: Self = Self { codes: Vec::new() };

    /// Creates a key from its codes.
    ///
    /// A key made only of wildcards is normalized to [`Key::ALL`].
    #[must_use]
    pub fn of<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        if codes.iter().all(|code| code.is_empty()) {
            Self::ALL
        } else {
            Self { codes }
        }
    }

    /// Parses a key in its dotted form (`M.BE.INDUSTRY`, `M..X`, `all`).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case(ALL_KEYWORD) {
            return Self::ALL;
        }
        Self::of(text.split(SEPARATOR))
    }

    /// Returns a builder for keys of the given dimensions.
    #[must_use]
    pub fn builder<I, S>(dimensions: I) -> KeyBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyBuilder::new(dimensions)
    }

    /// Number of positions in this key; zero for [`Key::ALL`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns true for [`Key::ALL`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Returns true if this key matches every series.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.codes.is_empty()
    }

    /// Returns the code at `index`, an empty string for a wildcard.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.codes.get(index).map(String::as_str)
    }

    /// Returns true if the position at `index` is a wildcard.
    #[must_use]
    pub fn is_wildcard(&self, index: usize) -> bool {
        self.codes.get(index).is_some_and(|code| code.is_empty())
    }

    /// Returns true if this key identifies a single series: no wildcard and
    /// no alternative codes.
    ///
    /// On a structure without dimensions [`Key::ALL`] is the only key and is
    /// trivially a series key.
    #[must_use]
    pub fn is_series(&self) -> bool {
        self.codes
            .iter()
            .all(|code| !code.is_empty() && !code.contains(OR))
    }

    /// Returns the codes of this key.
    #[must_use]
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Returns true if every series selected by `other` is selected by `self`.
    ///
    /// A wildcard position never restricts matching; a position with
    /// alternatives matches any of them.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        if self.is_all() {
            return true;
        }
        if other.is_all() || self.len() != other.len() {
            return false;
        }
        self.codes
            .iter()
            .zip(&other.codes)
            .all(|(mine, theirs)| position_contains(mine, theirs))
    }

    /// Checks that this key fits the dimensions of a data structure.
    ///
    /// # Errors
    /// Returns [`SdmxError::InvalidKey`] on a dimensionality mismatch or on a
    /// code unknown to a dimension that declares its codes.
    pub fn validate_on(&self, structure: &DataStructure) -> Result<()> {
        if self.is_all() {
            return Ok(());
        }
        let dimensions = structure.dimensions();
        if self.len() != dimensions.len() {
            return Err(SdmxError::InvalidKey {
                key: self.to_string(),
                reason: format!(
                    "expected {} dimensions, found {}",
                    dimensions.len(),
                    self.len()
                ),
            });
        }
        for (code, dimension) in self.codes.iter().zip(dimensions) {
            if dimension.codes().is_empty() {
                continue;
            }
            for alternative in code.split(OR).filter(|c| !c.is_empty()) {
                if !dimension.codes().contains_key(alternative) {
                    return Err(SdmxError::InvalidKey {
                        key: self.to_string(),
                        reason: format!(
                            "unknown code '{alternative}' for dimension '{}'",
                            dimension.id()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

fn position_contains(mine: &str, theirs: &str) -> bool {
    if mine.is_empty() {
        return true;
    }
    if theirs.is_empty() {
        return false;
    }
    theirs
        .split(OR)
        .all(|code| mine.split(OR).any(|candidate| candidate == code))
}

impl Default for Key {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return f.write_str(ALL_KEYWORD);
        }
        for (index, code) in self.codes.iter().enumerate() {
            if index > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(code)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl FromStr for Key {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

// Serialized as its codes: the dotted form cannot tell `Key::ALL` from a
// one-dimension key whose code is `all`.
impl From<Key> for Vec<String> {
    fn from(key: Key) -> Self {
        key.codes
    }
}

impl From<Vec<String>> for Key {
    fn from(codes: Vec<String>) -> Self {
        Self::of(codes)
    }
}

/// Incremental key construction keyed by dimension id.
///
/// Decoders keep one builder per cursor and call [`KeyBuilder::clear`]
/// between series.
#[derive(Clone, Debug)]
pub struct KeyBuilder {
    dimensions: Vec<String>,
    codes: Vec<String>,
}

impl KeyBuilder {
    /// Creates a builder for the given dimension ids, in key order.
    #[must_use]
    pub fn new<I, S>(dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dimensions: Vec<String> = dimensions.into_iter().map(Into::into).collect();
        let codes = vec![String::new(); dimensions.len()];
        Self { dimensions, codes }
    }

    /// Sets the code of a dimension; unknown dimension ids are ignored.
    pub fn put(&mut self, dimension: &str, code: impl Into<String>) -> &mut Self {
        if let Some(index) = self.dimensions.iter().position(|id| id == dimension) {
            self.codes[index] = code.into();
        }
        self
    }

    /// Resets every position to a wildcard.
    pub fn clear(&mut self) -> &mut Self {
        self.codes.iter_mut().for_each(String::clear);
        self
    }

    /// Returns the dimension ids of this builder.
    #[must_use]
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// Returns the code currently set for a dimension.
    #[must_use]
    pub fn code(&self, dimension: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .position(|id| id == dimension)
            .map(|index| self.codes[index].as_str())
    }

    /// Returns true if every dimension has a code.
    #[must_use]
    pub fn is_series(&self) -> bool {
        self.codes.iter().all(|code| !code.is_empty())
    }

    /// Builds the key from the current codes.
    #[must_use]
    pub fn build(&self) -> Key {
        Key::of(self.codes.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DataStructure, DataStructureRef, Dimension};

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Key::parse("all"), Key::ALL);
        assert_eq!(Key::parse(""), Key::ALL);
        assert_eq!(Key::parse(".."), Key::ALL);
        assert_eq!(Key::parse("M.BE.INDUSTRY").to_string(), "M.BE.INDUSTRY");
        assert_eq!(Key::parse("M..INDUSTRY").to_string(), "M..INDUSTRY");
        assert_eq!(Key::ALL.to_string(), "all");
        assert_eq!(Key::parse("M.BE.INDUSTRY").len(), 3);
    }

    #[test]
    fn test_all_contains_everything() {
        for text in ["all", "M.BE.INDUSTRY", "M..X", "A+M.BE.X"] {
            assert!(Key::ALL.contains(&Key::parse(text)));
        }
    }

    #[test]
    fn test_contains_is_reflexive() {
        for text in ["all", "M.BE.INDUSTRY", "M..X", "A+M.BE.X"] {
            let key = Key::parse(text);
            assert!(key.contains(&key), "{key} should contain itself");
        }
    }

    #[test]
    fn test_wildcard_never_restricts() {
        let key = Key::parse("M..INDUSTRY");
        assert!(key.contains(&Key::parse("M.BE.INDUSTRY")));
        assert!(key.contains(&Key::parse("M.FR.INDUSTRY")));
        assert!(key.contains(&Key::parse("M..INDUSTRY")));
        assert!(!key.contains(&Key::parse("A.BE.INDUSTRY")));
        assert!(!Key::parse("M.BE.INDUSTRY").contains(&key));
    }

    #[test]
    fn test_narrow_does_not_contain_broad() {
        let narrow = Key::parse("M.BE.INDUSTRY");
        assert!(!narrow.contains(&Key::ALL));
        assert!(!narrow.contains(&Key::parse("M.BE")));
    }

    #[test]
    fn test_alternatives() {
        let key = Key::parse("M.BE+FR.X");
        assert!(key.contains(&Key::parse("M.BE.X")));
        assert!(key.contains(&Key::parse("M.FR.X")));
        assert!(key.contains(&Key::parse("M.FR+BE.X")));
        assert!(!key.contains(&Key::parse("M.DE.X")));
        assert!(!key.contains(&Key::parse("M..X")));
        assert!(!key.is_series());
    }

    #[test]
    fn test_is_series_and_wildcards() {
        let key = Key::parse("M..X");
        assert!(key.is_wildcard(1));
        assert!(!key.is_wildcard(0));
        assert!(!key.is_wildcard(7));
        assert!(!key.is_series());
        assert!(Key::parse("M.BE.X").is_series());
        assert!(Key::ALL.is_series());
    }

    #[test]
    fn test_builder_reuse() {
        let mut builder = Key::builder(["FREQ", "REF_AREA", "SECTOR"]);
        builder.put("FREQ", "M").put("REF_AREA", "BE").put("SECTOR", "X");
        assert!(builder.is_series());
        assert_eq!(builder.build(), Key::parse("M.BE.X"));
        assert_eq!(builder.code("REF_AREA"), Some("BE"));

        builder.clear();
        assert!(!builder.is_series());
        assert_eq!(builder.build(), Key::ALL);

        builder.put("FREQ", "A").put("UNKNOWN", "Z");
        assert_eq!(builder.build(), Key::parse("A.."));
    }

    #[test]
    fn test_validate_on_structure() {
        let structure = DataStructure::builder(DataStructureRef::parse("ECB,EXR,1.0"))
            .dimension(Dimension::new("FREQ", 1).with_code("M", "Monthly"))
            .dimension(Dimension::new("REF_AREA", 2))
            .build();

        assert!(Key::ALL.validate_on(&structure).is_ok());
        assert!(Key::parse("M.BE").validate_on(&structure).is_ok());
        assert!(Key::parse("M.").validate_on(&structure).is_ok());
        assert!(matches!(
            Key::parse("M.BE.X").validate_on(&structure),
            Err(SdmxError::InvalidKey { .. })
        ));
        assert!(matches!(
            Key::parse("Q.BE").validate_on(&structure),
            Err(SdmxError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_serde_keeps_codes() {
        let key = Key::parse("M.BE.X");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"["M","BE","X"]"#);
        assert_eq!(serde_json::from_str::<Key>(&json).unwrap(), key);

        let code_all = Key::of(["ALL"]);
        assert_ne!(code_all, Key::ALL);
        let json = serde_json::to_string(&code_all).unwrap();
        assert_eq!(serde_json::from_str::<Key>(&json).unwrap(), code_all);
        assert_eq!(serde_json::to_string(&Key::ALL).unwrap(), "[]");
        assert_eq!(serde_json::from_str::<Key>(r#"["",""]"#).unwrap(), Key::ALL);
    }
}
