//! In-memory wide-column store
//!
//! Rows live in a DashMap per table, so a write only locks the shard that
//! holds its row and readers of other rows never contend.
//!
//! # Design
//!
//! - DashMap: sharded by row key, per-entry locking gives row atomicity
//! - FxHashMap: O(1) column lookups inside a row
//! - Versions: newest first, truncated to the family's max-versions
//!
//! Prefix scans filter and sort the whole table. That is acceptable here:
//! this backend exists for tests and simulation, not for production volume.

use crate::error::{Result, StoreError};
use crate::model::{Cell, CondMutation, Mutation, Predicate, Row};
use crate::traits::BigTable;
use dashmap::DashMap;
use gold_concurrency::Context;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Version {
    timestamp: i64,
    value: Vec<u8>,
}

/// Cells of one row, newest version first per column
#[derive(Debug, Default)]
struct StoredRow {
    cells: FxHashMap<(String, String), Vec<Version>>,
}

impl StoredRow {
    fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn latest(&self, family: &str, column: &str) -> Option<&Version> {
        self.cells
            .get(&(family.to_string(), column.to_string()))
            .and_then(|versions| versions.first())
    }

    fn apply(&mut self, mutation: &Mutation, max_versions: usize) {
        match mutation {
            Mutation::Set {
                family,
                column,
                timestamp,
                value,
            } => {
                let versions = self.cells.entry((family.clone(), column.clone())).or_default();
                match versions.iter_mut().find(|v| v.timestamp == *timestamp) {
                    Some(existing) => existing.value = value.clone(),
                    None => {
                        let pos = versions
                            .iter()
                            .position(|v| v.timestamp < *timestamp)
                            .unwrap_or(versions.len());
                        versions.insert(
                            pos,
                            Version {
                                timestamp: *timestamp,
                                value: value.clone(),
                            },
                        );
                    }
                }
                versions.truncate(max_versions.max(1));
            }
            Mutation::DeleteColumn { family, column } => {
                self.cells.remove(&(family.clone(), column.clone()));
            }
        }
    }

    fn to_row(&self, key: &str, family: Option<&str>) -> Option<Row> {
        let mut cells: Vec<Cell> = self
            .cells
            .iter()
            .filter(|((f, _), _)| family.map(|want| want == f.as_str()).unwrap_or(true))
            .filter_map(|((f, c), versions)| {
                versions.first().map(|v| Cell {
                    family: f.clone(),
                    column: c.clone(),
                    timestamp: v.timestamp,
                    value: v.value.clone(),
                })
            })
            .collect();
        if cells.is_empty() {
            return None;
        }
        cells.sort_by(|a, b| (&a.family, &a.column).cmp(&(&b.family, &b.column)));
        Some(Row {
            key: key.to_string(),
            cells,
        })
    }
}

/// One table: families with their retention, and rows
#[derive(Debug, Default)]
struct Table {
    families: RwLock<FxHashMap<String, usize>>,
    rows: DashMap<String, StoredRow>,
}

impl Table {
    fn max_versions(&self, table: &str, family: &str) -> Result<usize> {
        self.families
            .read()
            .get(family)
            .copied()
            .ok_or_else(|| StoreError::FamilyNotFound {
                table: table.to_string(),
                family: family.to_string(),
            })
    }

    fn retention_for(&self, table: &str, mutations: &[Mutation]) -> Result<Vec<usize>> {
        mutations
            .iter()
            .map(|m| self.max_versions(table, m.family()))
            .collect()
    }
}

/// Counters for observing store traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Rows written through `apply_bulk`
    pub rows_written: u64,
    /// Calls to `apply_bulk`
    pub bulk_calls: u64,
    /// Calls to `check_and_mutate`
    pub conditional_calls: u64,
    /// Conditional calls that applied at least one mutation
    pub conditional_writes: u64,
    /// Calls to `read_row` and `read_prefix`
    pub reads: u64,
}

#[derive(Debug, Default)]
struct Counters {
    rows_written: AtomicU64,
    bulk_calls: AtomicU64,
    conditional_calls: AtomicU64,
    conditional_writes: AtomicU64,
    reads: AtomicU64,
}

/// In-memory [`BigTable`]
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - reads take shard read locks only
/// - each row's mutations are applied under that row's entry lock
/// - `check_and_mutate` evaluates and applies under the same entry lock
///
/// # Example
///
/// ```ignore
/// use gold_storage::{BigTable, InMemoryBigTable};
///
/// let store = InMemoryBigTable::new();
/// store.create_table(&ctx, "gold")?;
/// ```
#[derive(Default)]
pub struct InMemoryBigTable {
    tables: DashMap<String, Arc<Table>>,
    counters: Counters,
    failing_writes: AtomicUsize,
}

impl InMemoryBigTable {
    /// Create an empty store with no tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` writes (bulk or conditional) fail with `Unavailable`
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Snapshot of the traffic counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            rows_written: self.counters.rows_written.load(Ordering::Relaxed),
            bulk_calls: self.counters.bulk_calls.load(Ordering::Relaxed),
            conditional_calls: self.counters.conditional_calls.load(Ordering::Relaxed),
            conditional_writes: self.counters.conditional_writes.load(Ordering::Relaxed),
            reads: self.counters.reads.load(Ordering::Relaxed),
        }
    }

    /// Number of non-empty rows in `table`
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Every row key in `table`, sorted
    pub fn row_keys(&self, table: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .tables
            .get(table)
            .map(|t| t.rows.iter().map(|r| r.key().clone()).collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn table(&self, table: &str) -> Result<Arc<Table>> {
        self.tables
            .get(table)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|left| warn!(remaining = left - 1, "injected write failure"))
            .is_ok()
    }
}

impl BigTable for InMemoryBigTable {
    fn create_table(&self, ctx: &Context, table: &str) -> Result<()> {
        ctx.check()?;
        match self.tables.entry(table.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::AlreadyExists(format!("table {}", table))),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                v.insert(Arc::new(Table::default()));
                debug!(table, "created table");
                Ok(())
            }
        }
    }

    fn create_column_family(&self, ctx: &Context, table: &str, family: &str, max_versions: usize) -> Result<()> {
        ctx.check()?;
        let t = self.table(table)?;
        let mut families = t.families.write();
        if families.contains_key(family) {
            return Err(StoreError::AlreadyExists(format!("family {} in table {}", family, table)));
        }
        families.insert(family.to_string(), max_versions.max(1));
        debug!(table, family, max_versions, "created column family");
        Ok(())
    }

    fn apply_bulk(&self, ctx: &Context, table: &str, rows: &[String], mutations: &[Vec<Mutation>]) -> Result<()> {
        ctx.check()?;
        if rows.len() != mutations.len() {
            return Err(StoreError::BulkMismatch {
                rows: rows.len(),
                mutations: mutations.len(),
            });
        }
        self.counters.bulk_calls.fetch_add(1, Ordering::Relaxed);
        if self.take_injected_failure() {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        let t = self.table(table)?;

        let retention = mutations
            .iter()
            .map(|muts| t.retention_for(table, muts))
            .collect::<Result<Vec<_>>>()?;

        for ((key, muts), keep) in rows.iter().zip(mutations).zip(retention) {
            ctx.check()?;
            let mut row = t.rows.entry(key.clone()).or_default();
            for (m, max_versions) in muts.iter().zip(keep) {
                row.apply(m, max_versions);
            }
            let empty = row.is_empty();
            drop(row);
            if empty {
                t.rows.remove_if(key, |_, r| r.is_empty());
            }
        }
        self.counters
            .rows_written
            .fetch_add(rows.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn check_and_mutate(&self, ctx: &Context, table: &str, row: &str, mutation: &CondMutation) -> Result<bool> {
        ctx.check()?;
        self.counters.conditional_calls.fetch_add(1, Ordering::Relaxed);
        if self.take_injected_failure() {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        let t = self.table(table)?;
        let on_match = t.retention_for(table, &mutation.on_match)?;
        let on_no_match = t.retention_for(table, &mutation.on_no_match)?;

        let mut stored = t.rows.entry(row.to_string()).or_default();
        let matched = match &mutation.predicate {
            Predicate::ColumnEquals { family, column, value } => stored
                .latest(family, column)
                .map(|v| &v.value == value)
                .unwrap_or(false),
            Predicate::ColumnExists { family, column } => stored.latest(family, column).is_some(),
        };

        let (branch, retention) = if matched {
            (&mutation.on_match, on_match)
        } else {
            (&mutation.on_no_match, on_no_match)
        };
        for (m, max_versions) in branch.iter().zip(retention) {
            stored.apply(m, max_versions);
        }
        let empty = stored.is_empty();
        drop(stored);
        if empty {
            t.rows.remove_if(row, |_, r| r.is_empty());
        }
        if !branch.is_empty() {
            self.counters.conditional_writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(matched)
    }

    fn read_row(&self, ctx: &Context, table: &str, row: &str, family: Option<&str>) -> Result<Option<Row>> {
        ctx.check()?;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let t = self.table(table)?;
        let found = t.rows.get(row).and_then(|r| r.to_row(row, family));
        Ok(found)
    }

    fn read_prefix(&self, ctx: &Context, table: &str, prefix: &str, family: Option<&str>) -> Result<Vec<Row>> {
        ctx.check()?;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let t = self.table(table)?;
        let mut rows: Vec<Row> = t
            .rows
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .filter_map(|entry| entry.value().to_row(entry.key(), family))
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }
}

impl std::fmt::Debug for InMemoryBigTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBigTable")
            .field("tables", &self.tables.len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gold_concurrency::ContextError;
    use std::thread;

    const TABLE: &str = "gold";

    fn setup() -> (InMemoryBigTable, Context) {
        let ctx = Context::background();
        let store = InMemoryBigTable::new();
        store.create_table(&ctx, TABLE).unwrap();
        store.create_column_family(&ctx, TABLE, "T", 1).unwrap();
        store.create_column_family(&ctx, TABLE, "H", 3).unwrap();
        (store, ctx)
    }

    fn put(store: &InMemoryBigTable, ctx: &Context, row: &str, family: &str, column: &str, ts: i64, value: &[u8]) {
        store
            .apply_bulk(
                ctx,
                TABLE,
                &[row.to_string()],
                &[vec![Mutation::set(family, column, ts, value.to_vec())]],
            )
            .unwrap();
    }

    #[test]
    fn test_create_is_not_idempotent() {
        let (store, ctx) = setup();
        assert!(store.create_table(&ctx, TABLE).unwrap_err().is_already_exists());
        assert!(store
            .create_column_family(&ctx, TABLE, "T", 1)
            .unwrap_err()
            .is_already_exists());
        assert_eq!(
            store.create_column_family(&ctx, "nope", "T", 1),
            Err(StoreError::TableNotFound("nope".into()))
        );
    }

    #[test]
    fn test_put_and_get() {
        let (store, ctx) = setup();
        put(&store, &ctx, "r1", "T", "000", 10, b"abc");

        let row = store.read_row(&ctx, TABLE, "r1", None).unwrap().unwrap();
        assert_eq!(row.cell("T", "000").unwrap().value, b"abc");
        assert!(store.read_row(&ctx, TABLE, "r2", None).unwrap().is_none());
    }

    #[test]
    fn test_latest_timestamp_wins_regardless_of_order() {
        let (store, ctx) = setup();
        put(&store, &ctx, "r1", "T", "000", 20, b"new");
        put(&store, &ctx, "r1", "T", "000", 10, b"old");

        let row = store.read_row(&ctx, TABLE, "r1", None).unwrap().unwrap();
        let cell = row.cell("T", "000").unwrap();
        assert_eq!(cell.value, b"new");
        assert_eq!(cell.timestamp, 20);
    }

    #[test]
    fn test_same_timestamp_overwrites() {
        let (store, ctx) = setup();
        put(&store, &ctx, "r1", "T", "000", 10, b"first");
        put(&store, &ctx, "r1", "T", "000", 10, b"second");
        let row = store.read_row(&ctx, TABLE, "r1", None).unwrap().unwrap();
        assert_eq!(row.cell("T", "000").unwrap().value, b"second");
    }

    #[test]
    fn test_unknown_family_rejects_whole_bulk() {
        let (store, ctx) = setup();
        let err = store
            .apply_bulk(
                &ctx,
                TABLE,
                &["a".to_string(), "b".to_string()],
                &[
                    vec![Mutation::set("T", "000", 1, vec![1])],
                    vec![Mutation::set("X", "000", 1, vec![1])],
                ],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::FamilyNotFound { .. }));
        assert_eq!(store.row_count(TABLE), 0);
    }

    #[test]
    fn test_bulk_mismatch() {
        let (store, ctx) = setup();
        let err = store.apply_bulk(&ctx, TABLE, &["a".to_string()], &[]).unwrap_err();
        assert_eq!(err, StoreError::BulkMismatch { rows: 1, mutations: 0 });
    }

    #[test]
    fn test_read_prefix_sorted_and_family_filtered() {
        let (store, ctx) = setup();
        put(&store, &ctx, "01:b", "T", "000", 1, b"x");
        put(&store, &ctx, "01:a", "T", "000", 1, b"y");
        put(&store, &ctx, "01:a", "H", "h", 1, b"z");
        put(&store, &ctx, "02:a", "T", "000", 1, b"w");

        let rows = store.read_prefix(&ctx, TABLE, "01:", Some("T")).unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["01:a", "01:b"]);
        assert!(rows.iter().all(|r| r.cells.iter().all(|c| c.family == "T")));

        let only_h = store.read_prefix(&ctx, TABLE, "01:", Some("H")).unwrap();
        assert_eq!(only_h.len(), 1);
    }

    #[test]
    fn test_check_and_mutate_equals() {
        let (store, ctx) = setup();
        put(&store, &ctx, "ops", "H", "h", 1, b"v1");

        let cas = |expected: &[u8], next: &[u8]| {
            CondMutation::if_match(
                Predicate::ColumnEquals {
                    family: "H".into(),
                    column: "h".into(),
                    value: expected.to_vec(),
                },
                vec![Mutation::set("H", "h", 2, next.to_vec())],
            )
        };

        assert!(!store.check_and_mutate(&ctx, TABLE, "ops", &cas(b"stale", b"v2")).unwrap());
        assert!(store.check_and_mutate(&ctx, TABLE, "ops", &cas(b"v1", b"v2")).unwrap());
        let row = store.read_row(&ctx, TABLE, "ops", None).unwrap().unwrap();
        assert_eq!(row.cell("H", "h").unwrap().value, b"v2");
        assert_eq!(store.stats().conditional_writes, 1);
    }

    #[test]
    fn test_check_and_mutate_create_if_absent() {
        let (store, ctx) = setup();
        let create = CondMutation::if_no_match(
            Predicate::ColumnExists {
                family: "H".into(),
                column: "h".into(),
            },
            vec![Mutation::set("H", "h", 1, b"v1".to_vec())],
        );
        assert!(!store.check_and_mutate(&ctx, TABLE, "ops", &create).unwrap());
        assert!(store.check_and_mutate(&ctx, TABLE, "ops", &create).unwrap());
        assert_eq!(store.stats().conditional_writes, 1);
    }

    #[test]
    fn test_failed_condition_leaves_no_row() {
        let (store, ctx) = setup();
        let cond = CondMutation::if_match(
            Predicate::ColumnExists {
                family: "H".into(),
                column: "h".into(),
            },
            vec![Mutation::set("H", "h", 1, b"v".to_vec())],
        );
        assert!(!store.check_and_mutate(&ctx, TABLE, "ghost", &cond).unwrap());
        assert_eq!(store.row_count(TABLE), 0);
    }

    #[test]
    fn test_injected_failures() {
        let (store, ctx) = setup();
        store.fail_next_writes(1);
        let err = store
            .apply_bulk(&ctx, TABLE, &["a".to_string()], &[vec![Mutation::set("T", "000", 1, vec![1])]])
            .unwrap_err();
        assert!(err.is_transient());
        put(&store, &ctx, "a", "T", "000", 1, b"ok");
        assert_eq!(store.row_count(TABLE), 1);
    }

    #[test]
    fn test_cancelled_context() {
        let (store, ctx) = setup();
        let cancelled = ctx.with_cancel();
        cancelled.cancel();
        assert_eq!(
            store.read_row(&cancelled, TABLE, "a", None),
            Err(StoreError::Context(ContextError::Cancelled))
        );
    }

    #[test]
    fn test_concurrent_cas_increments_are_not_lost() {
        let (store, ctx) = setup();
        put(&store, &ctx, "counter", "H", "h", 0, &0u64.to_be_bytes());
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let ctx = ctx.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        loop {
                            let row = store.read_row(&ctx, TABLE, "counter", Some("H")).unwrap().unwrap();
                            let current = row.cell("H", "h").unwrap().value.clone();
                            let n = u64::from_be_bytes(current.as_slice().try_into().unwrap());
                            let cond = CondMutation::if_match(
                                Predicate::ColumnEquals {
                                    family: "H".into(),
                                    column: "h".into(),
                                    value: current,
                                },
                                vec![Mutation::set("H", "h", 0, (n + 1).to_be_bytes().to_vec())],
                            );
                            if store.check_and_mutate(&ctx, TABLE, "counter", &cond).unwrap() {
                                break;
                            }
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let row = store.read_row(&ctx, TABLE, "counter", None).unwrap().unwrap();
        let n = u64::from_be_bytes(row.cell("H", "h").unwrap().value.as_slice().try_into().unwrap());
        assert_eq!(n, 400);
    }
}
