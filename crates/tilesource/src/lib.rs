//! Cached tiles for the Gold frontend
//!
//! [`CachedTileSource`] turns the trace store's dense tile into a
//! [`ComplexTile`]: public-only if an allow-list is configured, with and
//! without the traces hidden by [`IgnoreRule`]s. The last tile is cached
//! for a refresh window and can be rebuilt periodically in the background.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod complex;
pub mod config;
pub mod error;
pub mod ignore;
pub mod public;
pub mod reconcile;
pub mod source;

pub use complex::ComplexTile;
pub use config::TileSourceConfig;
pub use error::{Error, Result};
pub use ignore::{IgnoreRule, IgnoreStore, InMemoryIgnoreStore};
pub use public::PublicParamsRules;
pub use reconcile::ChangelistReconciler;
pub use source::{CachedTileSource, RefreshHandle};
