#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sdmx/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// The raw file client.
pub mod client;
/// File source configuration.
pub mod source;

pub use client::FileClient;
pub use source::FileSource;
