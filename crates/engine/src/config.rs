//! Trace store configuration
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```toml
//! table = "gold-skia"
//! shards = 8
//! read_timeout_secs = 60
//! ```

use crate::error::{Error, Result};
use crate::keys::{DEFAULT_SHARDS, DEFAULT_TILE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest tile size the column naming scheme supports
pub const MAX_TILE_SIZE: usize = 1000;

/// Largest shard count the row naming scheme supports
pub const MAX_SHARDS: u32 = 100;

/// Settings for [`BtTraceStore`](crate::BtTraceStore)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceStoreConfig {
    /// Table holding every row
    pub table: String,
    /// Commits per tile
    pub tile_size: usize,
    /// Shards per tile
    pub shards: u32,
    /// Budget for one read call, in seconds
    pub read_timeout_secs: u64,
    /// Budget for one write call, in seconds
    pub write_timeout_secs: u64,
    /// Rows per bulk write request
    pub write_batch_size: usize,
    /// Bulk write requests in flight per `put`
    pub write_concurrency: usize,
    /// Tiles loaded at once by a read, and shard reads at once per tile
    pub read_concurrency: usize,
    /// Tiles scanned before a dense tile gives up looking for more data
    pub max_tiles_for_dense_tile: usize,
    /// Keep param-set dictionaries in memory between calls
    pub cache_ops: bool,
}

impl Default for TraceStoreConfig {
    fn default() -> Self {
        Self {
            table: "gold".to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            shards: DEFAULT_SHARDS,
            read_timeout_secs: 4 * 60,
            write_timeout_secs: 10 * 60,
            write_batch_size: 1000,
            write_concurrency: 8,
            read_concurrency: 8,
            max_tiles_for_dense_tile: 50,
            cache_ops: true,
        }
    }
}

impl TraceStoreConfig {
    /// Default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document and validate it
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(Error::Config("table name must not be empty".into()));
        }
        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(Error::Config(format!(
                "tile_size must be in 1..={}, got {}",
                MAX_TILE_SIZE, self.tile_size
            )));
        }
        if self.shards == 0 || self.shards > MAX_SHARDS {
            return Err(Error::Config(format!(
                "shards must be in 1..={}, got {}",
                MAX_SHARDS, self.shards
            )));
        }
        if self.write_batch_size == 0 || self.write_concurrency == 0 {
            return Err(Error::Config("write batch size and concurrency must be positive".into()));
        }
        if self.read_concurrency == 0 {
            return Err(Error::Config("read_concurrency must be positive".into()));
        }
        if self.max_tiles_for_dense_tile == 0 {
            return Err(Error::Config("max_tiles_for_dense_tile must be positive".into()));
        }
        Ok(())
    }

    /// Read budget as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Write budget as a duration
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Set the table name
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set commits per tile
    pub fn tile_size(mut self, tile_size: usize) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Set shards per tile
    pub fn shards(mut self, shards: u32) -> Self {
        self.shards = shards;
        self
    }

    /// Set the read budget
    pub fn read_timeout_secs(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Set the write budget
    pub fn write_timeout_secs(mut self, secs: u64) -> Self {
        self.write_timeout_secs = secs;
        self
    }

    /// Set rows per bulk write
    pub fn write_batch_size(mut self, n: usize) -> Self {
        self.write_batch_size = n;
        self
    }

    /// Set bulk writes in flight per `put`
    pub fn write_concurrency(mut self, n: usize) -> Self {
        self.write_concurrency = n;
        self
    }

    /// Set tiles and shard reads in flight per read
    pub fn read_concurrency(mut self, n: usize) -> Self {
        self.read_concurrency = n;
        self
    }

    /// Set the dense-tile scan bound
    pub fn max_tiles_for_dense_tile(mut self, n: usize) -> Self {
        self.max_tiles_for_dense_tile = n;
        self
    }

    /// Enable or disable the param-set cache
    pub fn cache_ops(mut self, enabled: bool) -> Self {
        self.cache_ops = enabled;
        self
    }
}
