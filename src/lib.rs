//! # Gold trace store
//!
//! Stores per-commit image digests of every test configuration ("trace")
//! in a wide-column store and serves dense, filtered tiles of them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use goldtrace::prelude::*;
//!
//! let vcs = Arc::new(InMemoryVcs::with_commits(history));
//! let gold = Gold::builder().vcs(vcs).build()?;
//!
//! let ctx = Context::background();
//! gold.put(&ctx, &commit_hash, &[Entry::new(digest, params)], Utc::now())?;
//!
//! let (tile, commits) = gold.dense_tile(&ctx, 50)?;
//! let served = gold.complex_tile(&ctx)?;
//! ```
//!
//! ## Layers
//!
//! - [`gold_core`]: digests, params, traces and tiles
//! - [`gold_storage`]: the wide-column store contract and an in-memory store
//! - [`gold_engine`]: row layout, param-set dictionaries, tile assembly
//! - [`gold_tilesource`]: cached tiles with ignore rules and public filtering
//!
//! [`Gold`] wires them together.

#![warn(missing_docs)]

mod config;
mod error;
mod gold;

pub mod prelude;

pub use config::GoldConfig;
pub use error::{Error, Result};
pub use gold::{Gold, GoldBuilder};

pub use gold_concurrency;
pub use gold_core;
pub use gold_engine;
pub use gold_storage;
pub use gold_tilesource;
