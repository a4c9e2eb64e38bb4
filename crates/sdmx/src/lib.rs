#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sdmx/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Connections to SDMX data sources.
//!
//! This crate re-exports the core types and the cache, codec and source
//! crates of the workspace, and provides [`SdmxConnection`] and
//! [`SdmxRegistry`].
//!
//! # Features
//!
//! - `sqlite` - SQLite cache store (on by default)
//!
//! # Example
//!
//! ```rust,ignore
//! use sdmx::{DataDetail, DataQuery, DataflowRef, Key, SdmxRegistry, WebSource};
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> sdmx::Result<()> {
//!     let mut registry = SdmxRegistry::new();
//!     registry.register(WebSource::new(
//!         "ECB",
//!         Url::parse("https://data-api.ecb.europa.eu/service").unwrap(),
//!     ));
//!
//!     let connection = registry.connect("ECB")?;
//!     let flow = DataflowRef::parse("ECB,EXR,1.0");
//!     let keys = connection
//!         .get_data(&flow, &DataQuery::of(Key::ALL, DataDetail::SeriesKeysOnly))
//!         .await?;
//!     println!("{} series", keys.len());
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use sdmx_core::*;

// Cache implementations
#[cfg(feature = "sqlite")]
pub use sdmx_cache::SqliteCache;
pub use sdmx_cache::{CachedFileClient, CachedRestClient, FileCache, InMemoryCache, NoopCache};

// Codec and sources
pub use sdmx_csv::{SdmxCsvCursor, SdmxCsvWriter};
pub use sdmx_file::{FileClient, FileSource};
pub use sdmx_web::{SdmxWebClient, WebSource};

mod config;
mod connection;
mod registry;
pub use config::{CacheConfig, CacheKind, SdmxConfig};
pub use connection::SdmxConnection;
pub use registry::SdmxRegistry;
