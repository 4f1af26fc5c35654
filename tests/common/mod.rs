//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone};
use goldtrace::gold_storage::{BigTable, InMemoryBigTable};
use goldtrace::prelude::*;

pub const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const C: &str = "cccccccccccccccccccccccccccccccc";

/// Commit `i` of the synthetic history.
pub fn commit(i: usize) -> Commit {
    Commit {
        hash: format!("{:040x}", i + 1),
        author: format!("dev{}@example.com", i % 3),
        subject: format!("commit {}", i),
        commit_time: ts(i as i64),
    }
}

pub fn commits(n: usize) -> Vec<Commit> {
    (0..n).map(commit).collect()
}

/// A fixed instant `secs` seconds after the history starts.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
}

pub fn params(pairs: &[(&str, &str)]) -> Params {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

pub fn trace_id(pairs: &[(&str, &str)]) -> TraceId {
    TraceId::from_params(&params(pairs))
}

/// Digests of one trace, missing entries as empty strings.
pub fn digests(tile: &Tile, pairs: &[(&str, &str)]) -> Vec<String> {
    tile.traces
        .get(&trace_id(pairs))
        .map(|t| t.digests().iter().map(|d| d.to_string()).collect())
        .unwrap_or_default()
}

/// Route engine logs through the test harness; `RUST_LOG=debug` to see them.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A Gold instance over an in-memory store and history.
pub struct Fixture {
    pub gold: Gold,
    pub store: Arc<InMemoryBigTable>,
    pub vcs: Arc<InMemoryVcs>,
    pub ignores: Arc<InMemoryIgnoreStore>,
    pub ctx: Context,
}

impl Fixture {
    pub fn new(n_commits: usize, tile_size: usize, shards: u32) -> Self {
        Self::with_config(n_commits, {
            let mut config = GoldConfig::default();
            config.trace_store.tile_size = tile_size;
            config.trace_store.shards = shards;
            config
        })
    }

    pub fn with_config(n_commits: usize, config: GoldConfig) -> Self {
        init_logging();
        let store = Arc::new(InMemoryBigTable::new());
        let vcs = Arc::new(InMemoryVcs::with_commits(commits(n_commits)));
        let ignores = Arc::new(InMemoryIgnoreStore::new());
        let gold = Gold::builder()
            .config(config)
            .store(Arc::clone(&store) as Arc<dyn BigTable>)
            .vcs(Arc::clone(&vcs) as Arc<dyn Vcs>)
            .ignore_store(Arc::clone(&ignores) as Arc<dyn goldtrace::gold_tilesource::IgnoreStore>)
            .build()
            .unwrap();
        Self {
            gold,
            store,
            vcs,
            ignores,
            ctx: Context::background(),
        }
    }

    /// Write one digest per trace at commit `i`.
    pub fn put(&self, i: usize, rows: &[(&str, &[(&str, &str)])]) {
        let entries: Vec<Entry> = rows
            .iter()
            .map(|(digest, pairs)| Entry::new(*digest, params(pairs)))
            .collect();
        self.gold.put(&self.ctx, &commit(i).hash, &entries, ts(i as i64)).unwrap();
    }
}
