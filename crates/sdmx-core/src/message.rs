//! SDMX-JSON structure messages.
//!
//! Decodes the `data.dataflows`, `data.dataStructures` and `data.codelists`
//! parts of an SDMX-JSON 1.0 structure message into [`Dataflow`]s and
//! [`DataStructure`]s. Codes of a dimension are resolved through the
//! codelist its local representation points to.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::{
    error::{Result, SdmxError},
    types::{Attribute, DataStructure, DataStructureRef, Dataflow, DataflowRef, Dimension},
};

/// Decoded content of a structure message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructureMessage {
    /// Dataflows of the message.
    pub flows: Vec<Dataflow>,
    /// Data structures of the message, with their codes resolved.
    pub structures: Vec<DataStructure>,
}

impl StructureMessage {
    /// Decodes a message.
    ///
    /// # Errors
    /// Returns [`SdmxError::Parse`] on malformed JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let message: Message =
            serde_json::from_slice(bytes).map_err(|e| SdmxError::Parse(e.to_string()))?;
        Ok(message.data.into())
    }
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    data: MessageData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageData {
    #[serde(default)]
    dataflows: Vec<FlowDef>,
    #[serde(default)]
    data_structures: Vec<StructureDef>,
    #[serde(default)]
    codelists: Vec<CodelistDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlowDef {
    id: String,
    #[serde(rename = "agencyID")]
    agency_id: String,
    version: String,
    name: Option<String>,
    description: Option<String>,
    structure: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StructureDef {
    id: String,
    #[serde(rename = "agencyID")]
    agency_id: String,
    version: String,
    name: Option<String>,
    data_structure_components: Components,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Components {
    dimension_list: DimensionList,
    #[serde(default)]
    attribute_list: AttributeList,
    measure_list: Option<MeasureList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DimensionList {
    #[serde(default)]
    dimensions: Vec<ComponentDef>,
    #[serde(default)]
    time_dimensions: Vec<ComponentDef>,
}

#[derive(Debug, Default, Deserialize)]
struct AttributeList {
    #[serde(default)]
    attributes: Vec<ComponentDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeasureList {
    primary_measure: ComponentDef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentDef {
    id: String,
    position: Option<u32>,
    name: Option<String>,
    local_representation: Option<Representation>,
}

#[derive(Debug, Deserialize)]
struct Representation {
    enumeration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodelistDef {
    id: String,
    #[serde(rename = "agencyID")]
    agency_id: String,
    version: String,
    #[serde(default)]
    codes: Vec<CodeDef>,
}

#[derive(Debug, Deserialize)]
struct CodeDef {
    id: String,
    name: Option<String>,
}

type Codelists = BTreeMap<(String, String, String), BTreeMap<String, String>>;

impl From<MessageData> for StructureMessage {
    fn from(data: MessageData) -> Self {
        let codelists: Codelists = data
            .codelists
            .into_iter()
            .map(|list| {
                let codes = list
                    .codes
                    .into_iter()
                    .map(|code| {
                        let label = code.name.unwrap_or_else(|| code.id.clone());
                        (code.id, label)
                    })
                    .collect();
                ((list.agency_id, list.id, list.version), codes)
            })
            .collect();

        let flows = data
            .dataflows
            .into_iter()
            .map(|flow| {
                let structure_ref = DataStructureRef::from_urn(&flow.structure)
                    .unwrap_or_else(|| DataStructureRef::parse(&flow.structure));
                let dataflow = Dataflow::new(
                    DataflowRef::of(flow.agency_id, &flow.id, flow.version),
                    structure_ref,
                    flow.name.unwrap_or(flow.id),
                );
                match flow.description {
                    Some(description) => dataflow.with_description(description),
                    None => dataflow,
                }
            })
            .collect();

        let structures = data
            .data_structures
            .into_iter()
            .map(|structure| structure_of(structure, &codelists))
            .collect();

        Self { flows, structures }
    }
}

fn codes_of(component: &ComponentDef, codelists: &Codelists) -> BTreeMap<String, String> {
    component
        .local_representation
        .as_ref()
        .and_then(|r| r.enumeration.as_deref())
        .and_then(DataStructureRef::from_urn)
        .and_then(|r| {
            codelists.get(&(
                r.agency().to_string(),
                r.id().to_string(),
                r.version().to_string(),
            ))
        })
        .cloned()
        .unwrap_or_default()
}

fn structure_of(def: StructureDef, codelists: &Codelists) -> DataStructure {
    let components = def.data_structure_components;
    let mut builder = DataStructure::builder(DataStructureRef::of(
        def.agency_id,
        &def.id,
        def.version,
    ))
    .label(def.name.unwrap_or(def.id));

    for (index, dimension) in components.dimension_list.dimensions.iter().enumerate() {
        let position = dimension
            .position
            .unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX));
        let mut built = Dimension::new(&dimension.id, position)
            .with_codes(codes_of(dimension, codelists));
        if let Some(name) = &dimension.name {
            built = built.with_label(name);
        }
        builder = builder.dimension(built);
    }
    if let Some(time) = components.dimension_list.time_dimensions.first() {
        builder = builder.time_dimension_id(&time.id);
    }
    if let Some(measures) = components.measure_list {
        builder = builder.primary_measure_id(measures.primary_measure.id);
    }
    for attribute in components.attribute_list.attributes {
        let label = attribute.name.unwrap_or_else(|| attribute.id.clone());
        builder = builder.attribute(Attribute {
            id: attribute.id,
            label,
        });
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXR: &str = r#"{
      "data": {
        "dataflows": [{
          "id": "EXR", "agencyID": "ECB", "version": "1.0",
          "name": "Exchange Rates",
          "structure": "urn:sdmx:org.sdmx.infomodel.datastructure.DataStructure=ECB:ECB_EXR1(1.0)"
        }],
        "dataStructures": [{
          "id": "ECB_EXR1", "agencyID": "ECB", "version": "1.0",
          "name": "Exchange Rates",
          "dataStructureComponents": {
            "dimensionList": {
              "dimensions": [
                {"id": "CURRENCY", "position": 2, "name": "Currency",
                 "localRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=ECB:CL_CURRENCY(1.0)"}},
                {"id": "FREQ", "position": 1, "name": "Frequency",
                 "localRepresentation": {"enumeration": "urn:sdmx:org.sdmx.infomodel.codelist.Codelist=ECB:CL_FREQ(1.0)"}}
              ],
              "timeDimensions": [{"id": "TIME_PERIOD", "position": 3}]
            },
            "attributeList": {"attributes": [{"id": "TITLE", "name": "Series title"}]},
            "measureList": {"primaryMeasure": {"id": "OBS_VALUE"}}
          }
        }],
        "codelists": [
          {"id": "CL_FREQ", "agencyID": "ECB", "version": "1.0",
           "codes": [{"id": "A", "name": "Annual"}, {"id": "M", "name": "Monthly"}]},
          {"id": "CL_CURRENCY", "agencyID": "ECB", "version": "1.0",
           "codes": [{"id": "CHF", "name": "Swiss franc"}, {"id": "USD", "name": "US dollar"}]}
        ]
      }
    }"#;

    #[test]
    fn test_decodes_flows_and_structures() {
        let message = StructureMessage::from_slice(EXR.as_bytes()).unwrap();

        assert_eq!(message.flows.len(), 1);
        let flow = &message.flows[0];
        assert_eq!(flow.flow_ref, DataflowRef::parse("ECB,EXR,1.0"));
        assert_eq!(flow.structure_ref, DataStructureRef::parse("ECB,ECB_EXR1,1.0"));
        assert_eq!(flow.name, "Exchange Rates");

        let structure = &message.structures[0];
        assert_eq!(structure.dimension_ids().collect::<Vec<_>>(), vec!["FREQ", "CURRENCY"]);
        let freq = structure.dimension("FREQ").unwrap();
        assert_eq!(freq.label(), "Frequency");
        assert_eq!(freq.codes().get("M").map(String::as_str), Some("Monthly"));
        assert_eq!(structure.attributes()[0].label, "Series title");
        assert_eq!(structure.time_dimension_id(), "TIME_PERIOD");
    }

    #[test]
    fn test_tolerates_missing_parts() {
        let message = StructureMessage::from_slice(br#"{"data": {}}"#).unwrap();
        assert_eq!(message, StructureMessage::default());
        assert!(matches!(
            StructureMessage::from_slice(b"<xml/>"),
            Err(SdmxError::Parse(_))
        ));
    }
}
