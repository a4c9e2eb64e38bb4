#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sdmx/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SDMX REST source.
//!
//! # Example
//!
//! ```no_run
//! use sdmx_core::{DataflowRef, SdmxClient};
//! use sdmx_web::{SdmxWebClient, WebSource};
//! use url::Url;
//!
//! # async fn example() -> sdmx_core::Result<()> {
//! let endpoint = Url::parse("https://data-api.ecb.europa.eu/service").unwrap();
//! let client = SdmxWebClient::new(WebSource::new("ECB", endpoint))?;
//! let flow = client.get_flow(&DataflowRef::parse("ECB,EXR,1.0")).await?;
//! println!("{}", flow.name);
//! # Ok(())
//! # }
//! ```

/// The REST client.
pub mod client;
/// Endpoint configuration.
pub mod source;

pub use client::SdmxWebClient;
pub use source::{SDMX21, WebSource};
