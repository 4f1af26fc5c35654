//! Ignore rules
//!
//! An ignore rule hides every trace matching its query from the default
//! view of a tile until the rule expires. Ignored traces stay available to
//! callers that ask for them explicitly.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use gold_concurrency::Context;
use gold_core::{ParamSet, Params, Tile};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A query of traces to hide, valid until `expires`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRule {
    /// Rule identifier
    pub id: String,
    /// Traces whose params match this set are ignored
    pub query: ParamSet,
    /// The rule stops applying at this instant
    pub expires: DateTime<Utc>,
    /// Why the traces are ignored
    pub note: String,
}

impl IgnoreRule {
    /// True if the rule still applies at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }

    /// True if the rule's query matches `params`
    pub fn matches(&self, params: &Params) -> bool {
        self.query.matches(params)
    }
}

/// Source of ignore rules
pub trait IgnoreStore: Send + Sync {
    /// All rules, expired or not
    fn list(&self, ctx: &Context) -> Result<Vec<IgnoreRule>>;
}

/// Rules kept in memory
#[derive(Debug, Default)]
pub struct InMemoryIgnoreStore {
    rules: RwLock<Vec<IgnoreRule>>,
}

impl InMemoryIgnoreStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, replacing any rule with the same id
    pub fn create(&self, rule: IgnoreRule) {
        let mut rules = self.rules.write();
        rules.retain(|r| r.id != rule.id);
        rules.push(rule);
    }

    /// Remove a rule; errors if no rule has this id
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(Error::Ignore(format!("no ignore rule with id {}", id)));
        }
        Ok(())
    }
}

impl IgnoreStore for InMemoryIgnoreStore {
    fn list(&self, ctx: &Context) -> Result<Vec<IgnoreRule>> {
        ctx.check()?;
        Ok(self.rules.read().clone())
    }
}

/// Rules still active at `now`
pub fn active_rules(rules: Vec<IgnoreRule>, now: DateTime<Utc>) -> Vec<IgnoreRule> {
    rules.into_iter().filter(|r| r.is_active(now)).collect()
}

/// A copy of `tile` without the traces matched by any of `rules`
pub fn filter_ignored(tile: &Tile, rules: &[IgnoreRule]) -> Tile {
    if rules.is_empty() {
        return tile.clone();
    }
    tile.filtered(|trace| !rules.iter().any(|r| r.matches(trace.keys())))
}
