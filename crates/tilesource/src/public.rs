//! Public visibility filtering
//!
//! Instances that serve a public audience only show traces whose params
//! match an allow-list. In TOML each rule is one `[[public_params]]` table:
//!
//! ```toml
//! [[public_params]]
//! source_type = ["gm", "svg"]
//! os = ["Android"]
//! ```

use gold_core::{ParamSet, Params, Tile};
use serde::{Deserialize, Serialize};

/// Allow-list of param queries
///
/// A trace is public if any rule matches it. An empty list hides everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicParamsRules(Vec<ParamSet>);

impl PublicParamsRules {
    /// Rules from a list of queries
    pub fn new(rules: Vec<ParamSet>) -> Self {
        Self(rules)
    }

    /// The queries
    pub fn rules(&self) -> &[ParamSet] {
        &self.0
    }

    /// True if a trace with these params may be shown
    pub fn is_public(&self, params: &Params) -> bool {
        self.0.iter().any(|rule| rule.matches(params))
    }

    /// A copy of `tile` with only the public traces
    pub fn filter(&self, tile: &Tile) -> Tile {
        tile.filtered(|trace| self.is_public(trace.keys()))
    }
}
