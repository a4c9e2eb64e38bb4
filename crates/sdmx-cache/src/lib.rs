#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/sdmx/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching implementations for SDMX data sources.
//!
//! This crate provides implementations of the [`SdmxCache`] trait from `sdmx-core`:
//!
//! - [`SqliteCache`] - Persistent SQLite-based cache (requires `sqlite` feature)
//! - [`FileCache`] - One file per key, optionally gzip-compressed
//! - [`InMemoryCache`] - Process-wide in-memory cache
//! - [`NoopCache`] - No-op cache that doesn't store anything
//!
//! and the [`CachedRestClient`] / [`CachedFileClient`] wrappers built on
//! [`TypedId`] keys.

/// Cached client wrappers.
pub mod client;
/// File-per-key cache implementation.
pub mod file;
/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;
/// Typed cache keys.
pub mod typed_id;

/// SQLite-based cache implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the trait for convenience
pub use sdmx_core::SdmxCache;

// Re-export implementations
pub use client::{CachedFileClient, CachedRestClient, DEFAULT_TTL};
pub use file::{CacheSerializer, ErrorListener, FileCache, FileEntry, JsonSerializer};
pub use memory::InMemoryCache;
pub use noop::NoopCache;
pub use typed_id::TypedId;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCache;
