//! Per-tile param-set dictionaries and their update protocol
//!
//! Each tile has one dictionary row (`:ts:o:{tile}:`) holding the serialized
//! [`OrderedParamSet`] and a hash of it. Writers that need new codes extend
//! the dictionary with a conditional mutation:
//!
//! - if the row existed, the write only applies if the stored hash is still
//!   the one we read (compare-and-swap)
//! - if the row did not exist, the write only applies if it still does not
//!   (create-if-absent)
//!
//! A writer that loses the race drops its cached copy and starts over, so
//! codes handed out by any writer are never reassigned.

use crate::error::Result;
use crate::keys::{unsharded_row_name, TileKey, COLUMN_HASH, COLUMN_OPS, FAMILY_OPS, TYPE_OPS};
use dashmap::DashMap;
use gold_concurrency::Context;
use gold_core::{OrderedParamSet, ParamSet};
use gold_storage::{BigTable, CondMutation, Mutation, Predicate};
use sha2::{Digest as _, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};

/// A dictionary as last read from or written to the store
#[derive(Debug, Clone)]
pub struct OpsCacheEntry {
    /// The dictionary
    pub ops: Arc<OrderedParamSet>,
    /// Stored content hash, empty if the row did not exist
    pub hash: String,
    /// Whether the row existed in the store
    pub existed: bool,
    /// Cell timestamp of the stored hash
    pub timestamp: i64,
}

impl OpsCacheEntry {
    fn absent() -> Self {
        Self {
            ops: Arc::new(OrderedParamSet::new()),
            hash: String::new(),
            existed: false,
            timestamp: 0,
        }
    }
}

/// Process-wide cache of tile dictionaries, keyed by row name
///
/// Entries are filled on first access, dropped when a conditional write
/// reveals them to be stale, and never expire otherwise.
pub struct OpsCache {
    store: Arc<dyn BigTable>,
    table: String,
    enabled: bool,
    entries: DashMap<String, OpsCacheEntry>,
}

impl OpsCache {
    /// Cache over `table`; with `enabled = false` every call reads the store
    pub fn new(store: Arc<dyn BigTable>, table: impl Into<String>, enabled: bool) -> Self {
        Self {
            store,
            table: table.into(),
            enabled,
            entries: DashMap::new(),
        }
    }

    /// Current dictionary of a tile, empty if the tile has none yet
    pub fn get_ops(&self, ctx: &Context, tile_key: TileKey) -> Result<Arc<OrderedParamSet>> {
        Ok(self.load(ctx, tile_key)?.ops)
    }

    /// Forget the cached dictionary of a tile
    pub fn invalidate(&self, tile_key: TileKey) {
        self.entries.remove(&unsharded_row_name(TYPE_OPS, tile_key));
    }

    /// Number of cached dictionaries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make sure every key and value of `params` has a code in the tile
    ///
    /// Returns the dictionary that covers `params`. Retries for as long as
    /// other writers win the race; store errors end the loop.
    pub fn update_ordered_param_set(
        &self,
        ctx: &Context,
        tile_key: TileKey,
        params: &ParamSet,
    ) -> Result<Arc<OrderedParamSet>> {
        let row = unsharded_row_name(TYPE_OPS, tile_key);
        let mut attempts = 0usize;
        loop {
            ctx.check()?;
            attempts += 1;

            let current = self.load(ctx, tile_key)?;
            if current.ops.contains_all(params) {
                return Ok(current.ops);
            }

            let mut ops = (*current.ops).clone();
            ops.update(params);
            let bytes = ops.to_bytes()?;
            let hash = content_hash(&bytes);
            let timestamp = now_micros().max(current.timestamp + 1);

            let mutations = vec![
                Mutation::set(FAMILY_OPS, COLUMN_OPS, timestamp, bytes),
                Mutation::set(FAMILY_OPS, COLUMN_HASH, timestamp, hash.clone().into_bytes()),
            ];
            let (cond, applied_when) = if current.existed {
                let predicate = Predicate::ColumnEquals {
                    family: FAMILY_OPS.to_string(),
                    column: COLUMN_HASH.to_string(),
                    value: current.hash.clone().into_bytes(),
                };
                (CondMutation::if_match(predicate, mutations), true)
            } else {
                let predicate = Predicate::ColumnExists {
                    family: FAMILY_OPS.to_string(),
                    column: COLUMN_HASH.to_string(),
                };
                (CondMutation::if_no_match(predicate, mutations), false)
            };

            let matched = self.store.check_and_mutate(ctx, &self.table, &row, &cond)?;
            if matched != applied_when {
                debug!(tile_key = %tile_key, attempts, "param set changed underneath us, retrying");
                self.entries.remove(&row);
                continue;
            }

            let ops = Arc::new(ops);
            if self.enabled {
                self.entries.insert(
                    row,
                    OpsCacheEntry {
                        ops: Arc::clone(&ops),
                        hash,
                        existed: true,
                        timestamp,
                    },
                );
            }
            debug!(tile_key = %tile_key, keys = ops.key_order().len(), attempts, "param set updated");
            return Ok(ops);
        }
    }

    fn load(&self, ctx: &Context, tile_key: TileKey) -> Result<OpsCacheEntry> {
        let row_name = unsharded_row_name(TYPE_OPS, tile_key);
        if self.enabled {
            if let Some(entry) = self.entries.get(&row_name) {
                return Ok(entry.clone());
            }
        }

        let Some(row) = self.store.read_row(ctx, &self.table, &row_name, Some(FAMILY_OPS))? else {
            return Ok(OpsCacheEntry::absent());
        };
        let entry = match (row.cell(FAMILY_OPS, COLUMN_OPS), row.cell(FAMILY_OPS, COLUMN_HASH)) {
            (Some(ops_cell), Some(hash_cell)) => OpsCacheEntry {
                ops: Arc::new(OrderedParamSet::from_bytes(&ops_cell.value)?),
                hash: String::from_utf8_lossy(&hash_cell.value).into_owned(),
                existed: true,
                timestamp: hash_cell.timestamp,
            },
            // Half-written rows are never cached. The next conditional write
            // is keyed on whatever hash is stored and rewrites both cells.
            (None, Some(hash_cell)) => {
                warn!(row = %row_name, "param set row has a hash but no dictionary");
                return Ok(OpsCacheEntry {
                    ops: Arc::new(OrderedParamSet::new()),
                    hash: String::from_utf8_lossy(&hash_cell.value).into_owned(),
                    existed: true,
                    timestamp: hash_cell.timestamp,
                });
            }
            (Some(ops_cell), None) => {
                warn!(row = %row_name, "param set row has a dictionary but no hash");
                return Ok(OpsCacheEntry {
                    ops: Arc::new(OrderedParamSet::from_bytes(&ops_cell.value)?),
                    hash: String::new(),
                    existed: false,
                    timestamp: ops_cell.timestamp,
                });
            }
            (None, None) => return Ok(OpsCacheEntry::absent()),
        };
        if self.enabled {
            self.entries.insert(row_name, entry.clone());
        }
        Ok(entry)
    }
}

/// Hex SHA-256 of a serialized dictionary
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub(crate) fn now_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
