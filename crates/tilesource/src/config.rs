//! Tile source configuration

use crate::error::{Error, Result};
use crate::public::PublicParamsRules;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for [`CachedTileSource`](crate::CachedTileSource)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSourceConfig {
    /// Commits with data per tile
    pub n_commits: usize,
    /// A cached tile younger than this is served as is, in seconds
    pub refresh_interval_secs: u64,
    /// Allow-list for public instances; everything is visible if unset
    pub public_params: Option<PublicParamsRules>,
}

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self {
            n_commits: 50,
            refresh_interval_secs: 5 * 60,
            public_params: None,
        }
    }
}

impl TileSourceConfig {
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

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.n_commits == 0 {
            return Err(Error::Config("n_commits must be positive".into()));
        }
        Ok(())
    }

    /// Refresh window as a duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Set commits per tile
    pub fn n_commits(mut self, n: usize) -> Self {
        self.n_commits = n;
        self
    }

    /// Set the refresh window
    pub fn refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    /// Restrict tiles to public traces
    pub fn public_params(mut self, rules: PublicParamsRules) -> Self {
        self.public_params = Some(rules);
        self
    }
}
