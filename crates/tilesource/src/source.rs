//! Cached tile source
//!
//! Builds [`ComplexTile`]s from the trace store and keeps the last one
//! around. A refresh runs the whole pipeline:
//!
//! 1. pull new commits into the VCS
//! 2. fetch the dense tile
//! 3. drop non-public traces, if an allow-list is configured
//! 4. apply the active ignore rules
//! 5. swap the cached tile and kick off changelist reconciliation
//!
//! Readers never wait on reconciliation and only wait on a refresh when the
//! cached tile is older than the refresh window.

use crate::complex::ComplexTile;
use crate::config::TileSourceConfig;
use crate::error::Result;
use crate::ignore::{active_rules, filter_ignored, IgnoreStore};
use crate::reconcile::{spawn_reconcile, ChangelistReconciler};
use chrono::Utc;
use gold_concurrency::Context;
use gold_engine::{TraceStore, Vcs};
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

struct Cached {
    tile: Arc<ComplexTile>,
    built_at: Instant,
}

/// Serves the most recent [`ComplexTile`]
pub struct CachedTileSource {
    traces: Arc<dyn TraceStore>,
    vcs: Arc<dyn Vcs>,
    ignores: Arc<dyn IgnoreStore>,
    reconciler: Option<Arc<dyn ChangelistReconciler>>,
    config: TileSourceConfig,
    last: RwLock<Option<Cached>>,
    refresh: Mutex<()>,
}

impl CachedTileSource {
    /// Create a source; nothing is fetched until the first request
    pub fn new(
        config: TileSourceConfig,
        traces: Arc<dyn TraceStore>,
        vcs: Arc<dyn Vcs>,
        ignores: Arc<dyn IgnoreStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            traces,
            vcs,
            ignores,
            reconciler: None,
            config,
            last: RwLock::new(None),
            refresh: Mutex::new(()),
        })
    }

    /// Reconcile commits after every refresh
    pub fn with_reconciler(mut self, reconciler: Arc<dyn ChangelistReconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Settings in use
    pub fn config(&self) -> &TileSourceConfig {
        &self.config
    }

    /// The current tile, refreshed first if the cached one is too old
    pub fn get_tile(&self, ctx: &Context) -> Result<Arc<ComplexTile>> {
        if let Some(tile) = self.fresh_tile() {
            return Ok(tile);
        }
        let _guard = self.refresh.lock();
        // Someone else may have refreshed while we waited.
        if let Some(tile) = self.fresh_tile() {
            return Ok(tile);
        }
        self.rebuild(ctx)
    }

    /// The cached tile, however old, without refreshing
    pub fn last_tile(&self) -> Option<Arc<ComplexTile>> {
        self.last.read().as_ref().map(|c| Arc::clone(&c.tile))
    }

    /// Rebuild the tile now, regardless of its age
    pub fn update_tile(&self, ctx: &Context) -> Result<Arc<ComplexTile>> {
        let _guard = self.refresh.lock();
        self.rebuild(ctx)
    }

    /// Rebuild the tile every `interval` on a background thread
    ///
    /// Failures are logged and the previous tile stays in place. The thread
    /// stops when the handle is stopped or dropped, or when the source is.
    pub fn start_background_refresh(self: &Arc<Self>, interval: Duration) -> std::io::Result<RefreshHandle> {
        let ctx = Context::background();
        let stop = ctx.clone();
        let source: Weak<Self> = Arc::downgrade(self);
        let thread = std::thread::Builder::new()
            .name("gold-tile-refresh".into())
            .spawn(move || {
                while ctx.sleep(interval).is_ok() {
                    let Some(source) = source.upgrade() else { break };
                    if let Err(e) = source.update_tile(&ctx) {
                        error!(error = %e, "background tile refresh failed");
                    }
                }
                debug!("background tile refresh stopped");
            })?;
        info!(interval_ms = interval.as_millis() as u64, "started background tile refresh");
        Ok(RefreshHandle {
            stop,
            thread: Some(thread),
        })
    }

    fn fresh_tile(&self) -> Option<Arc<ComplexTile>> {
        let last = self.last.read();
        let cached = last.as_ref()?;
        (cached.built_at.elapsed() < self.config.refresh_interval()).then(|| Arc::clone(&cached.tile))
    }

    fn rebuild(&self, ctx: &Context) -> Result<Arc<ComplexTile>> {
        let started = Instant::now();
        self.vcs.update(ctx)?;
        let (dense, all_commits) = self.traces.get_dense_tile(ctx, self.config.n_commits)?;

        let with_ignores = match &self.config.public_params {
            Some(rules) => rules.filter(&dense),
            None => dense,
        };
        let rules = active_rules(self.ignores.list(ctx)?, Utc::now());
        let without_ignores = filter_ignored(&with_ignores, &rules);

        let tile = Arc::new(ComplexTile {
            data_commits: with_ignores.commits.clone(),
            all_commits,
            tile_with_ignores: Arc::new(with_ignores),
            tile_without_ignores: Arc::new(without_ignores),
            ignore_rules: rules,
        });

        *self.last.write() = Some(Cached {
            tile: Arc::clone(&tile),
            built_at: Instant::now(),
        });
        debug!(
            commits = tile.data_commits.len(),
            traces = tile.tile_with_ignores.traces.len(),
            ignored = tile.ignored_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refreshed tile"
        );

        if let Some(reconciler) = &self.reconciler {
            let spawned = spawn_reconcile(Arc::clone(reconciler), Context::background(), tile.all_commits.clone());
            if let Err(e) = spawned {
                error!(error = %e, "could not start changelist reconciliation");
            }
        }
        Ok(tile)
    }
}

/// Stops a background refresh when stopped or dropped
#[derive(Debug)]
pub struct RefreshHandle {
    stop: Context,
    thread: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Stop refreshing and wait for the thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("background tile refresh panicked");
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
