//! File configuration.
//!
//! One TOML file configures both layers:
//!
//! ```toml
//! [trace_store]
//! table = "gold"
//! tile_size = 256
//! shards = 32
//!
//! [tile_source]
//! n_commits = 50
//! refresh_interval_secs = 300
//! ```

use crate::error::{Error, Result};
use gold_engine::TraceStoreConfig;
use gold_tilesource::TileSourceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of a [`Gold`](crate::Gold) instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldConfig {
    /// Storage engine settings
    pub trace_store: TraceStoreConfig,
    /// Tile cache settings
    pub tile_source: TileSourceConfig,
}

impl GoldConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check both sections.
    pub fn validate(&self) -> Result<()> {
        self.trace_store.validate()?;
        self.tile_source.validate()?;
        Ok(())
    }
}
