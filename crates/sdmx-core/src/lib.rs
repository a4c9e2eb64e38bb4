#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sdmx/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for SDMX data sources.
//!
//! This crate provides the foundational abstractions shared by every source:
//!
//! - [`Key`](key::Key) / [`DataQuery`](query::DataQuery) - Series selection
//! - [`DataCursor`](cursor::DataCursor) - Forward-only series/observation protocol
//! - [`DataSet`](data_set::DataSet) - Materialized, key-addressable series
//! - [`SdmxClient`](client::SdmxClient) - Raw transport access to a source
//! - [`SdmxCache`](cache::SdmxCache) - Caching abstraction
//! - [`DataRepository`](repository::DataRepository) - The unit of cached payload

/// Cache trait for storing fetched repositories.
pub mod cache;
/// Raw client trait implemented by transports.
pub mod client;
/// Time sources used to compute expiry.
pub mod clock;
/// The cursor protocol and its in-memory implementations.
pub mod cursor;
/// Materialized data sets.
pub mod data_set;
/// Error types for SDMX operations.
pub mod error;
/// Series frequencies.
pub mod frequency;
/// Series keys.
pub mod key;
/// SDMX-JSON structure messages.
pub mod message;
/// Reporting period parsing.
pub mod period;
/// Data queries and detail levels.
pub mod query;
/// Repositories and the repository-backed client.
pub mod repository;
/// Series and observations.
pub mod series;
/// Metadata types (Dataflow, DataStructure, references, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::SdmxCache;
pub use client::{DataResponse, SdmxClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cursor::{DataCursor, FilteredCursor, SeriesCursor, SeriesIter};
pub use data_set::{DataSet, DataSetBuilder};
pub use error::{Result, SdmxError};
pub use frequency::Frequency;
pub use key::{Key, KeyBuilder};
pub use message::StructureMessage;
pub use query::{DataDetail, DataQuery};
pub use repository::{DataRepository, RepositoryClient};
pub use series::{Obs, Series, SeriesBuilder};
pub use types::{
    Attribute, DataStructure, DataStructureBuilder, DataStructureRef, Dataflow, DataflowRef,
    Dimension, Languages,
};
