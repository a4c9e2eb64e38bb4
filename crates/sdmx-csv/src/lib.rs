#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sdmx/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Column layout and structure inference.
pub mod layout;
/// Streaming decoder.
pub mod reader;
/// Encoder.
pub mod writer;

pub use layout::{DATAFLOW_COLUMN, dataflow_of, format_dataflow, infer_structure, parse_dataflow};
pub use reader::SdmxCsvCursor;
pub use writer::{SdmxCsvWriter, format_period_for};
