//! Convenient imports for Gold.
//!
//! ```ignore
//! use goldtrace::prelude::*;
//! ```

// Main entry point
pub use crate::gold::{Gold, GoldBuilder};
pub use crate::config::GoldConfig;

// Error handling
pub use crate::error::{Error, Result};

// Data model
pub use gold_core::{Commit, Digest, ParamSet, Params, Tile, Trace, TraceId, TraceMap};

// Cancellation
pub use gold_concurrency::Context;

// Engine
pub use gold_engine::{Entry, InMemoryVcs, TraceStore, TraceStoreConfig, Vcs};

// Tiles
pub use gold_tilesource::{ComplexTile, IgnoreRule, InMemoryIgnoreStore, PublicParamsRules, TileSourceConfig};

// Commonly needed alongside the API
pub use chrono::Utc;
pub use std::sync::Arc;
