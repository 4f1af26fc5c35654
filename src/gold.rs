//! Main entry point for Gold.
//!
//! This module provides the `Gold` struct, which wires a store, a commit
//! history, the trace store engine and the tile cache together.

use crate::config::GoldConfig;
use crate::error::Result;
use gold_concurrency::Context;
use gold_core::{Commit, Tile};
use gold_engine::{init_bigtable, BtTraceStore, Entry, InMemoryVcs, TraceStore, TraceStoreConfig, Vcs};
use gold_storage::{BigTable, InMemoryBigTable};
use gold_tilesource::{
    CachedTileSource, ChangelistReconciler, ComplexTile, IgnoreStore, InMemoryIgnoreStore, RefreshHandle,
    TileSourceConfig,
};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A Gold trace store instance.
///
/// Create one with [`Gold::builder`] or [`Gold::ephemeral`].
///
/// # Example
///
/// ```ignore
/// use goldtrace::prelude::*;
///
/// let vcs = Arc::new(InMemoryVcs::with_commits(commits));
/// let gold = Gold::builder().vcs(vcs).tile_size(64).build()?;
///
/// let ctx = Context::background();
/// gold.put(&ctx, &hash, &[Entry::new(digest, params)], Utc::now())?;
/// let tile = gold.complex_tile(&ctx)?;
/// ```
pub struct Gold {
    store: Arc<dyn BigTable>,
    vcs: Arc<dyn Vcs>,
    traces: Arc<BtTraceStore>,
    tiles: Arc<CachedTileSource>,
    config: GoldConfig,
}

impl Gold {
    /// Create a builder.
    pub fn builder() -> GoldBuilder {
        GoldBuilder::new()
    }

    /// An instance over an in-memory store with default settings.
    pub fn ephemeral(vcs: Arc<dyn Vcs>) -> Result<Self> {
        Self::builder().vcs(vcs).build()
    }

    /// Record digests for one commit.
    ///
    /// See [`TraceStore::put`].
    pub fn put(&self, ctx: &Context, commit_hash: &str, entries: &[Entry], ts: DateTime<Utc>) -> Result<()> {
        Ok(self.traces.put(ctx, commit_hash, entries, ts)?)
    }

    /// The last `n_commits` commits as stored.
    pub fn tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)> {
        Ok(self.traces.get_tile(ctx, n_commits)?)
    }

    /// The last `n_commits` commits with data, plus the commits they span.
    pub fn dense_tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)> {
        Ok(self.traces.get_dense_tile(ctx, n_commits)?)
    }

    /// The cached, filtered tile served to the frontend.
    pub fn complex_tile(&self, ctx: &Context) -> Result<Arc<ComplexTile>> {
        Ok(self.tiles.get_tile(ctx)?)
    }

    /// Rebuild the cached tile now.
    pub fn refresh(&self, ctx: &Context) -> Result<Arc<ComplexTile>> {
        Ok(self.tiles.update_tile(ctx)?)
    }

    /// Rebuild the cached tile periodically until the handle is dropped.
    pub fn start_background_refresh(&self, interval: Duration) -> Result<RefreshHandle> {
        Ok(self.tiles.start_background_refresh(interval)?)
    }

    /// The trace store engine.
    pub fn traces(&self) -> &Arc<BtTraceStore> {
        &self.traces
    }

    /// The tile cache.
    pub fn tiles(&self) -> &Arc<CachedTileSource> {
        &self.tiles
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn BigTable> {
        &self.store
    }

    /// The commit history.
    pub fn vcs(&self) -> &Arc<dyn Vcs> {
        &self.vcs
    }

    /// Effective settings.
    pub fn config(&self) -> &GoldConfig {
        &self.config
    }
}

/// Builder for a [`Gold`] instance.
///
/// Every collaborator defaults to its in-memory implementation.
///
/// # Example
///
/// ```ignore
/// let gold = Gold::builder()
///     .config_file("gold.toml")?
///     .store(bigtable)
///     .vcs(vcs)
///     .build()?;
/// ```
pub struct GoldBuilder {
    config: GoldConfig,
    store: Option<Arc<dyn BigTable>>,
    vcs: Option<Arc<dyn Vcs>>,
    ignores: Option<Arc<dyn IgnoreStore>>,
    reconciler: Option<Arc<dyn ChangelistReconciler>>,
    init_table: bool,
}

impl GoldBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: GoldConfig::default(),
            store: None,
            vcs: None,
            ignores: None,
            reconciler: None,
            init_table: true,
        }
    }

    /// Replace all settings.
    pub fn config(mut self, config: GoldConfig) -> Self {
        self.config = config;
        self
    }

    /// Load settings from a TOML file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = GoldConfig::from_toml_file(path)?;
        Ok(self)
    }

    /// Replace the storage engine settings.
    pub fn trace_store_config(mut self, config: TraceStoreConfig) -> Self {
        self.config.trace_store = config;
        self
    }

    /// Replace the tile cache settings.
    pub fn tile_source_config(mut self, config: TileSourceConfig) -> Self {
        self.config.tile_source = config;
        self
    }

    /// Set commits per storage tile.
    pub fn tile_size(mut self, tile_size: usize) -> Self {
        self.config.trace_store.tile_size = tile_size;
        self
    }

    /// Set shards per storage tile.
    pub fn shards(mut self, shards: u32) -> Self {
        self.config.trace_store.shards = shards;
        self
    }

    /// Set commits with data per served tile.
    pub fn n_commits(mut self, n: usize) -> Self {
        self.config.tile_source.n_commits = n;
        self
    }

    /// Use this store instead of an in-memory one.
    pub fn store(mut self, store: Arc<dyn BigTable>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use this commit history.
    pub fn vcs(mut self, vcs: Arc<dyn Vcs>) -> Self {
        self.vcs = Some(vcs);
        self
    }

    /// Use this ignore rule store.
    pub fn ignore_store(mut self, ignores: Arc<dyn IgnoreStore>) -> Self {
        self.ignores = Some(ignores);
        self
    }

    /// Reconcile commits with changelists after each tile refresh.
    pub fn reconciler(mut self, reconciler: Arc<dyn ChangelistReconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Skip creating the table and its column families.
    pub fn skip_table_init(mut self) -> Self {
        self.init_table = false;
        self
    }

    /// Build the instance, creating the table if needed.
    pub fn build(self) -> Result<Gold> {
        self.config.validate()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryBigTable::new()) as Arc<dyn BigTable>);
        let vcs = self
            .vcs
            .unwrap_or_else(|| Arc::new(InMemoryVcs::new()) as Arc<dyn Vcs>);
        let ignores = self
            .ignores
            .unwrap_or_else(|| Arc::new(InMemoryIgnoreStore::new()) as Arc<dyn IgnoreStore>);

        if self.init_table {
            init_bigtable(&Context::background(), store.as_ref(), &self.config.trace_store)?;
        }

        let traces = Arc::new(BtTraceStore::new(
            self.config.trace_store.clone(),
            Arc::clone(&store),
            Arc::clone(&vcs),
        )?);
        let mut tiles = CachedTileSource::new(
            self.config.tile_source.clone(),
            Arc::clone(&traces) as Arc<dyn TraceStore>,
            Arc::clone(&vcs),
            ignores,
        )?;
        if let Some(reconciler) = self.reconciler {
            tiles = tiles.with_reconciler(reconciler);
        }

        info!(
            table = %self.config.trace_store.table,
            tile_size = self.config.trace_store.tile_size,
            shards = self.config.trace_store.shards,
            "gold ready"
        );
        Ok(Gold {
            store,
            vcs,
            traces,
            tiles: Arc::new(tiles),
            config: self.config,
        })
    }
}

impl Default for GoldBuilder {
    fn default() -> Self {
        Self::new()
    }
}
