//! Trace storage engine for Gold
//!
//! Stores per-commit digests of every trace in a wide-column store and
//! assembles tiles from them:
//! - [`keys`]: row and column naming, tile keys, sharding
//! - [`OpsCache`]: per-tile param-set dictionaries and their
//!   compare-and-swap update protocol
//! - [`BtTraceStore`]: `put`, `get_tile` and `get_dense_tile`
//! - [`Vcs`]: the commit history the store is indexed by
//! - [`init_bigtable`]: table bootstrap
//!
//! # Example
//!
//! ```ignore
//! let ctx = Context::background();
//! init_bigtable(&ctx, store.as_ref(), &config)?;
//! let traces = BtTraceStore::new(config, store, vcs)?;
//! traces.put(&ctx, &hash, &[Entry::new(digest, params)], Utc::now())?;
//! let (tile, all_commits) = traces.get_dense_tile(&ctx, 50)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod admin;
pub mod config;
pub mod error;
pub mod keys;
pub mod ops_cache;
pub mod tracestore;
pub mod vcs;

pub use admin::init_bigtable;
pub use config::TraceStoreConfig;
pub use error::{Error, Result};
pub use keys::TileKey;
pub use ops_cache::{OpsCache, OpsCacheEntry};
pub use tracestore::{BtTraceStore, Entry, TraceStore};
pub use vcs::{InMemoryVcs, Vcs};
