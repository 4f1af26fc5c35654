//! Core types for the Gold trace store
//!
//! This crate defines the data model shared by every layer:
//! - [`Digest`]: content hash of a rendered image, plus its binary codec
//! - [`Params`], [`ParamSet`], [`TraceId`]: trace identity
//! - [`OrderedParamSet`]: per-tile dictionary for compact trace ids
//! - [`Trace`], [`TraceMap`]: digest time series and the map utilities
//!   used to stitch and condense tiles
//! - [`Tile`], [`Commit`], [`IndexCommit`]: the assembled query result

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod digest;
pub mod error;
pub mod ops;
pub mod params;
pub mod tile;
pub mod trace;
pub mod types;

pub use digest::{digest_from_bytes, digest_to_bytes, Digest, DIGEST_BYTES, MISSING_DIGEST_BYTES};
pub use error::{Error, Result};
pub use ops::{OpsEncoder, OrderedParamSet};
pub use params::{ParamSet, Params, TraceId};
pub use tile::Tile;
pub use trace::{Fill, Trace, TraceMap};
pub use types::{Commit, IndexCommit};
