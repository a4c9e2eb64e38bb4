//! Metadata types of SDMX sources.
//!
//! This module defines the reference and structural types:
//!
//! - [`DataflowRef`] / [`DataStructureRef`] - `AGENCY,ID,VERSION` references
//! - [`Dataflow`] - A named dataset definition
//! - [`DataStructure`] - The dimensional schema of a dataflow
//! - [`Dimension`] / [`Attribute`] - Components of a structure
//! - [`Languages`] - Language priority used for labels

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const ALL_AGENCIES: &str = "all";
const LATEST_VERSION: &str = "latest";

fn parse_triplet(text: &str) -> (String, String, String) {
    let mut parts = text.trim().split(',').map(str::trim);
    let first = parts.next().unwrap_or_default();
    match (parts.next(), parts.next()) {
        (None, _) => (
            ALL_AGENCIES.to_string(),
            first.to_string(),
            LATEST_VERSION.to_string(),
        ),
        (Some(id), None) => (first.to_string(), id.to_string(), LATEST_VERSION.to_string()),
        (Some(id), Some(version)) => (first.to_string(), id.to_string(), version.to_string()),
    }
}

fn triplet_contains(mine: (&str, &str, &str), theirs: (&str, &str, &str)) -> bool {
    (mine.0 == ALL_AGENCIES || mine.0 == theirs.0)
        && mine.1 == theirs.1
        && (mine.2 == LATEST_VERSION || mine.2 == theirs.2)
}

/// Reference to a dataflow.
///
/// Parsed from `AGENCY,ID,VERSION`, `AGENCY,ID` or `ID`; a missing agency
/// means any agency and a missing version means the latest one.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DataflowRef {
    agency: String,
    id: String,
    version: String,
}

impl DataflowRef {
    /// Creates a reference from its parts.
    #[must_use]
    pub fn of(agency: impl Into<String>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            id: id.into(),
            version: version.into(),
        }
    }

    /// Parses a reference.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (agency, id, version) = parse_triplet(text);
        Self { agency, id, version }
    }

    /// Returns the maintenance agency.
    #[must_use]
    pub fn agency(&self) -> &str {
        &self.agency
    }

    /// Returns the dataflow id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns true if this reference designates `other`, taking the `all`
    /// agency and `latest` version wildcards into account.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        triplet_contains(
            (&self.agency, &self.id, &self.version),
            (&other.agency, &other.id, &other.version),
        )
    }
}

impl fmt::Display for DataflowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.agency, self.id, self.version)
    }
}

impl FromStr for DataflowRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<DataflowRef> for String {
    fn from(r: DataflowRef) -> Self {
        r.to_string()
    }
}

impl TryFrom<String> for DataflowRef {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(Self::parse(&s))
    }
}

/// Reference to a data structure definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DataStructureRef {
    agency: String,
    id: String,
    version: String,
}

impl DataStructureRef {
    /// Creates a reference from its parts.
    #[must_use]
    pub fn of(agency: impl Into<String>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            id: id.into(),
            version: version.into(),
        }
    }

    /// Parses a reference in `AGENCY,ID,VERSION` form.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (agency, id, version) = parse_triplet(text);
        Self { agency, id, version }
    }

    /// Parses an SDMX URN such as
    /// `urn:sdmx:org.sdmx.infomodel.datastructure.DataStructure=ECB:ECB_EXR1(1.0)`.
    #[must_use]
    pub fn from_urn(urn: &str) -> Option<Self> {
        let (_, reference) = urn.split_once('=')?;
        let (agency, rest) = reference.split_once(':')?;
        let (id, version) = match rest.split_once('(') {
            Some((id, version)) => (id, version.trim_end_matches(')')),
            None => (rest, LATEST_VERSION),
        };
        Some(Self::of(agency, id, version))
    }

    /// Returns the maintenance agency.
    #[must_use]
    pub fn agency(&self) -> &str {
        &self.agency
    }

    /// Returns the structure id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns true if this reference designates `other`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        triplet_contains(
            (&self.agency, &self.id, &self.version),
            (&other.agency, &other.id, &other.version),
        )
    }
}

impl fmt::Display for DataStructureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.agency, self.id, self.version)
    }
}

impl From<DataStructureRef> for String {
    fn from(r: DataStructureRef) -> Self {
        r.to_string()
    }
}

impl TryFrom<String> for DataStructureRef {
    type Error = std::convert::Infallible;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Ok(Self::parse(&s))
    }
}

/// A named, versioned dataset definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataflow {
    /// Reference of this dataflow.
    pub flow_ref: DataflowRef,
    /// Reference of the structure its data conforms to.
    pub structure_ref: DataStructureRef,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
}

impl Dataflow {
    /// Creates a dataflow.
    #[must_use]
    pub fn new(
        flow_ref: DataflowRef,
        structure_ref: DataStructureRef,
        name: impl Into<String>,
    ) -> Self {
        Self {
            flow_ref,
            structure_ref,
            name: name.into(),
            description: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A dimension of a data structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    id: String,
    position: u32,
    label: String,
    codes: BTreeMap<String, String>,
}

impl Dimension {
    /// Creates a dimension with no declared codes.
    #[must_use]
    pub fn new(id: impl Into<String>, position: u32) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            position,
            codes: BTreeMap::new(),
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Declares a code of this dimension.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.codes.insert(code.into(), label.into());
        self
    }

    /// Declares several codes at once.
    #[must_use]
    pub fn with_codes(mut self, codes: BTreeMap<String, String>) -> Self {
        self.codes.extend(codes);
        self
    }

    /// Returns the dimension id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the 1-based position of this dimension in keys.
    #[must_use]
    pub const fn position(&self) -> u32 {
        self.position
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the declared codes, empty when the codes are not known.
    #[must_use]
    pub const fn codes(&self) -> &BTreeMap<String, String> {
        &self.codes
    }
}

/// A series-level attribute of a data structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute id.
    pub id: String,
    /// Human-readable label.
    pub label: String,
}

impl Attribute {
    /// Creates an attribute labelled by its id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
        }
    }
}

/// The dimensional schema a dataflow's data conforms to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStructure {
    structure_ref: DataStructureRef,
    label: String,
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    time_dimension_id: String,
    primary_measure_id: String,
}

impl DataStructure {
    /// Default id of the time dimension.
    pub const TIME_PERIOD: &'static str = "TIME_PERIOD";
    /// Default id of the primary measure.
    pub const OBS_VALUE: &'static str = "OBS_VALUE";

    /// Returns a builder for a structure.
    #[must_use]
    pub fn builder(structure_ref: DataStructureRef) -> DataStructureBuilder {
        DataStructureBuilder {
            structure: Self {
                label: structure_ref.id().to_string(),
                structure_ref,
                dimensions: Vec::new(),
                attributes: Vec::new(),
                time_dimension_id: Self::TIME_PERIOD.to_string(),
                primary_measure_id: Self::OBS_VALUE.to_string(),
            },
        }
    }

    /// Returns the reference of this structure.
    #[must_use]
    pub const fn structure_ref(&self) -> &DataStructureRef {
        &self.structure_ref
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the dimensions ordered by position.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Returns the dimension ids in key order.
    pub fn dimension_ids(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(Dimension::id)
    }

    /// Returns a dimension by id.
    #[must_use]
    pub fn dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    /// Returns the series-level attributes.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Returns the id of the time dimension.
    #[must_use]
    pub fn time_dimension_id(&self) -> &str {
        &self.time_dimension_id
    }

    /// Returns the id of the primary measure.
    #[must_use]
    pub fn primary_measure_id(&self) -> &str {
        &self.primary_measure_id
    }
}

/// Builder for [`DataStructure`].
#[derive(Clone, Debug)]
pub struct DataStructureBuilder {
    structure: DataStructure,
}

impl DataStructureBuilder {
    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.structure.label = label.into();
        self
    }

    /// Adds a dimension.
    #[must_use]
    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.structure.dimensions.push(dimension);
        self
    }

    /// Adds a series-level attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.structure.attributes.push(attribute);
        self
    }

    /// Sets the id of the time dimension.
    #[must_use]
    pub fn time_dimension_id(mut self, id: impl Into<String>) -> Self {
        self.structure.time_dimension_id = id.into();
        self
    }

    /// Sets the id of the primary measure.
    #[must_use]
    pub fn primary_measure_id(mut self, id: impl Into<String>) -> Self {
        self.structure.primary_measure_id = id.into();
        self
    }

    /// Builds the structure with dimensions ordered by position.
    #[must_use]
    pub fn build(mut self) -> DataStructure {
        self.structure.dimensions.sort_by_key(Dimension::position);
        self.structure
    }
}

/// Language priority list used when negotiating labels, in
/// `Accept-Language` syntax (`en,fr;q=0.7`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Languages(String);

impl Languages {
    /// Any language.
    pub const ANY: &'static str = "*";

    /// Creates a priority list.
    #[must_use]
    pub fn new(priority: impl Into<String>) -> Self {
        let priority = priority.into();
        if priority.trim().is_empty() {
            Self(Self::ANY.to_string())
        } else {
            Self(priority)
        }
    }

    /// Returns the list as an `Accept-Language` header value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Languages {
    fn default() -> Self {
        Self(Self::ANY.to_string())
    }
}

impl fmt::Display for Languages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
