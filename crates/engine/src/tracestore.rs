//! Sharded trace storage on a wide-column store
//!
//! # Layout
//!
//! History is cut into tiles of `tile_size` commits. Per tile there is one
//! param-set dictionary row and, per trace, one digest row and optionally
//! one options row. Trace rows are spread over `shards` row-key prefixes by
//! a checksum of the encoded trace id, so reading a tile is `2 * shards`
//! independent prefix scans.
//!
//! # Reads
//!
//! [`TraceStore::get_tile`] returns the last N commits as stored.
//! [`TraceStore::get_dense_tile`] walks tiles backwards and keeps only
//! commits that carry data, which is what the tile source serves.

use crate::config::TraceStoreConfig;
use crate::error::{Error, Result};
use crate::keys::{
    calc_sharded_row_name, column_for_offset, extract_subkey, get_tile_key, offset_from_column, shard_prefix,
    TileKey, COLUMN_OPTIONS, FAMILY_OPTIONS, FAMILY_TRACE, TYPE_OPTIONS, TYPE_TRACE,
};
use crate::ops_cache::OpsCache;
use crate::vcs::Vcs;
use chrono::{DateTime, Utc};
use gold_concurrency::{group, Context, TaskGroup};
use gold_core::{
    digest_from_bytes, digest_to_bytes, Commit, Digest, OrderedParamSet, ParamSet, Params, Tile, Trace, TraceId,
    TraceMap,
};
use gold_storage::{BigTable, Mutation, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// One digest observed for one trace at one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The digest, may be missing
    pub digest: Digest,
    /// Trace identity
    pub params: Params,
    /// Per-trace options; only the latest write is kept
    pub options: Params,
}

impl Entry {
    /// An entry without options
    pub fn new(digest: impl Into<Digest>, params: Params) -> Self {
        Self {
            digest: digest.into(),
            params,
            options: Params::new(),
        }
    }

    /// Attach options
    pub fn with_options(mut self, options: Params) -> Self {
        self.options = options;
        self
    }
}

/// Ingestion and tile queries
pub trait TraceStore: Send + Sync {
    /// Record `entries` at `commit_hash`
    ///
    /// Cells are written with timestamp `ts`; for a cell written twice the
    /// later timestamp wins no matter which call lands last. The call fails
    /// as a whole if any write fails.
    fn put(&self, ctx: &Context, commit_hash: &str, entries: &[Entry], ts: DateTime<Utc>) -> Result<()>;

    /// The last `n_commits` commits and every trace with data in them
    fn get_tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)>;

    /// The last `n_commits` commits that carry data
    ///
    /// Returns the dense tile and every commit from its oldest commit to the
    /// newest commit in the repository, with or without data.
    fn get_dense_tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)>;
}

impl<T: TraceStore + ?Sized> TraceStore for Arc<T> {
    fn put(&self, ctx: &Context, commit_hash: &str, entries: &[Entry], ts: DateTime<Utc>) -> Result<()> {
        (**self).put(ctx, commit_hash, entries, ts)
    }

    fn get_tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)> {
        (**self).get_tile(ctx, n_commits)
    }

    fn get_dense_tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)> {
        (**self).get_dense_tile(ctx, n_commits)
    }
}

/// [`TraceStore`] over a [`BigTable`]
pub struct BtTraceStore {
    store: Arc<dyn BigTable>,
    vcs: Arc<dyn Vcs>,
    config: TraceStoreConfig,
    ops: OpsCache,
}

impl BtTraceStore {
    /// Create a trace store; the table must already exist
    ///
    /// See [`init_bigtable`](crate::init_bigtable).
    pub fn new(config: TraceStoreConfig, store: Arc<dyn BigTable>, vcs: Arc<dyn Vcs>) -> Result<Self> {
        config.validate()?;
        let ops = OpsCache::new(Arc::clone(&store), config.table.clone(), config.cache_ops);
        Ok(Self {
            store,
            vcs,
            config,
            ops,
        })
    }

    /// Settings in use
    pub fn config(&self) -> &TraceStoreConfig {
        &self.config
    }

    /// History the store resolves commits against
    pub fn vcs(&self) -> &Arc<dyn Vcs> {
        &self.vcs
    }

    /// The param-set dictionary cache
    pub fn ops_cache(&self) -> &OpsCache {
        &self.ops
    }

    fn resolve_commit(&self, ctx: &Context, hash: &str) -> Result<usize> {
        if let Some(index) = self.vcs.index_of(ctx, hash)? {
            return Ok(index);
        }
        debug!(commit = %hash, "commit unknown, updating vcs");
        self.vcs.update(ctx)?;
        self.vcs
            .index_of(ctx, hash)?
            .ok_or_else(|| Error::CommitNotFound(hash.to_string()))
    }

    /// Every trace of one tile, each `tile_size` digests long
    fn load_tile(&self, ctx: &Context, tile_key: TileKey) -> Result<TraceMap> {
        let shards = self.config.shards;
        let table = self.config.table.as_str();
        let store = &self.store;

        let (ops, shard_rows) = group::join(
            ctx,
            |ctx: &Context| self.ops.get_ops(ctx, tile_key),
            |ctx: &Context| {
                let tasks: Vec<_> = (0..shards)
                    .map(|shard| {
                        move |ctx: &Context| -> Result<(Vec<Row>, Vec<Row>)> {
                            let traces = store.read_prefix(
                                ctx,
                                table,
                                &shard_prefix(shard, TYPE_TRACE, tile_key),
                                Some(FAMILY_TRACE),
                            )?;
                            let options = store.read_prefix(
                                ctx,
                                table,
                                &shard_prefix(shard, TYPE_OPTIONS, tile_key),
                                Some(FAMILY_OPTIONS),
                            )?;
                            Ok((traces, options))
                        }
                    })
                    .collect();
                TaskGroup::new(ctx).limit(self.config.read_concurrency).run(tasks)
            },
        )?;

        let mut decoder = TileDecoder {
            cache: &self.ops,
            tile_key,
            ops,
            reloaded: false,
        };
        let tile_size = self.config.tile_size;

        let mut options: HashMap<String, Params> = HashMap::new();
        for row in shard_rows.iter().flat_map(|(_, opts)| opts) {
            let Some(subkey) = extract_subkey(&row.key) else { continue };
            let Some(cell) = row.cell(FAMILY_OPTIONS, COLUMN_OPTIONS) else { continue };
            match TraceId::from_raw(String::from_utf8_lossy(&cell.value)).to_params() {
                Ok(p) => {
                    options.insert(subkey.to_string(), p);
                }
                Err(e) => warn!(row = %row.key, error = %e, "skipping corrupt options"),
            }
        }

        let mut traces = TraceMap::new();
        for row in shard_rows.iter().flat_map(|(t, _)| t) {
            let Some(subkey) = extract_subkey(&row.key) else {
                warn!(row = %row.key, "skipping row with malformed name");
                continue;
            };
            let Some(params) = decoder.decode(ctx, subkey)? else {
                warn!(row = %row.key, tile_key = %tile_key, "skipping row with undecodable trace id");
                continue;
            };

            let id = TraceId::from_params(&params);
            let trace = traces
                .entry(id)
                .or_insert_with(|| Trace::new_empty(params, tile_size));
            if let Some(opts) = options.get(subkey) {
                trace.set_options(opts.clone());
            }
            let digests = trace.digests_mut();
            for cell in row.family(FAMILY_TRACE) {
                match offset_from_column(&cell.column) {
                    Some(offset) if offset < tile_size => {
                        let digest = digest_from_bytes(&cell.value);
                        if !digest.is_missing() || digests[offset].is_missing() {
                            digests[offset] = digest;
                        }
                    }
                    _ => warn!(row = %row.key, column = %cell.column, "skipping cell outside the tile"),
                }
            }
        }

        debug!(tile_key = %tile_key, traces = traces.len(), "loaded tile");
        Ok(traces)
    }

    /// Traces over global commit indices `begin..end`, stitched across tiles
    fn load_span(&self, ctx: &Context, begin: usize, end: usize) -> Result<TraceMap> {
        let tile_size = self.config.tile_size;
        let first_tile = begin / tile_size;
        let last_tile = (end - 1) / tile_size;

        let tasks: Vec<_> = (first_tile..=last_tile)
            .map(|tile_index| {
                move |ctx: &Context| -> Result<(usize, TraceMap)> {
                    let traces = self.load_tile(ctx, TileKey::from_index(tile_index as i64))?;
                    Ok((tile_index, traces))
                }
            })
            .collect();
        let tiles = TaskGroup::new(ctx).limit(self.config.read_concurrency).run(tasks)?;

        let mut stitched = TraceMap::new();
        let mut stitched_len = 0;
        for (tile_index, traces) in tiles.into_iter().rev() {
            let tile_begin = tile_index * tile_size;
            let seg_begin = begin.max(tile_begin) - tile_begin;
            let seg_end = end.min(tile_begin + tile_size) - tile_begin;
            let offsets: Vec<usize> = (seg_begin..seg_end).collect();
            let segment = traces.make_from_commit_indexes(&offsets);
            stitched.prepend_traces_with_len(&segment, offsets.len(), stitched_len);
            stitched_len += offsets.len();
        }

        if stitched_len != end - begin || !stitched.is_aligned(stitched_len) {
            return Err(Error::Internal(format!(
                "stitched {} slots for commits {}..{}",
                stitched_len, begin, end
            )));
        }
        Ok(stitched)
    }
}

/// Decodes encoded trace ids of one tile, reloading a stale dictionary once
struct TileDecoder<'a> {
    cache: &'a OpsCache,
    tile_key: TileKey,
    ops: Arc<OrderedParamSet>,
    reloaded: bool,
}

impl TileDecoder<'_> {
    fn decode(&mut self, ctx: &Context, encoded: &str) -> Result<Option<Params>> {
        if let Ok(params) = self.ops.decode_params_from_string(encoded) {
            return Ok(Some(params));
        }
        if self.reloaded {
            return Ok(None);
        }
        // Another writer may have added codes since we cached the dictionary.
        self.reloaded = true;
        self.cache.invalidate(self.tile_key);
        self.ops = self.cache.get_ops(ctx, self.tile_key)?;
        Ok(self.ops.decode_params_from_string(encoded).ok())
    }
}

impl TraceStore for BtTraceStore {
    fn put(&self, ctx: &Context, commit_hash: &str, entries: &[Entry], ts: DateTime<Utc>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let ctx = ctx.with_timeout(self.config.write_timeout());
        let index = self.resolve_commit(&ctx, commit_hash)?;
        let (tile_key, offset) = get_tile_key(index, self.config.tile_size);

        let mut batch = ParamSet::new();
        for entry in entries {
            batch.add_params(&entry.params);
        }
        let ops = self.ops.update_ordered_param_set(&ctx, tile_key, &batch)?;
        let encoder = ops.encoder();

        let timestamp = ts.timestamp_micros();
        let column = column_for_offset(offset);
        let shards = self.config.shards;
        let mut rows = Vec::with_capacity(entries.len());
        let mut mutations = Vec::with_capacity(entries.len());
        for entry in entries {
            let encoded = encoder.encode(&entry.params)?;
            rows.push(calc_sharded_row_name(TYPE_TRACE, tile_key, &encoded, shards));
            mutations.push(vec![Mutation::set(
                FAMILY_TRACE,
                &column,
                timestamp,
                digest_to_bytes(&entry.digest),
            )]);
            if !entry.options.is_empty() {
                rows.push(calc_sharded_row_name(TYPE_OPTIONS, tile_key, &encoded, shards));
                mutations.push(vec![Mutation::set(
                    FAMILY_OPTIONS,
                    COLUMN_OPTIONS,
                    timestamp,
                    TraceId::from_params(&entry.options).as_str().as_bytes().to_vec(),
                )]);
            }
        }

        let table = self.config.table.as_str();
        let store = &self.store;
        let batch_size = self.config.write_batch_size;
        let tasks: Vec<_> = rows
            .chunks(batch_size)
            .zip(mutations.chunks(batch_size))
            .map(|(rows, mutations)| {
                move |ctx: &Context| -> Result<()> { Ok(store.apply_bulk(ctx, table, rows, mutations)?) }
            })
            .collect();
        let batches = tasks.len();
        TaskGroup::new(&ctx)
            .limit(self.config.write_concurrency)
            .run(tasks)?;

        debug!(
            commit = %commit_hash,
            tile_key = %tile_key,
            offset,
            rows = rows.len(),
            batches,
            "put entries"
        );
        Ok(())
    }

    fn get_tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)> {
        let ctx = ctx.with_timeout(self.config.read_timeout());
        if self.vcs.last_n_index(&ctx, 1)?.is_empty() {
            return Err(Error::NoCommits);
        }
        if n_commits == 0 {
            return Ok((Tile::default(), Vec::new()));
        }
        let span = self.vcs.last_n_index(&ctx, n_commits)?;
        let (Some(first), Some(last)) = (span.first(), span.last()) else {
            return Err(Error::Internal("vcs lost its commits during a read".into()));
        };
        let (begin, end) = (first.index, last.index + 1);
        if end - begin != span.len() {
            return Err(Error::Internal(format!(
                "vcs returned {} commits for indices {}..{}",
                span.len(),
                begin,
                end
            )));
        }
        let hashes: Vec<String> = span.iter().map(|c| c.hash.clone()).collect();

        let (commits, mut traces) = group::join(
            &ctx,
            |ctx: &Context| self.vcs.details(ctx, &hashes),
            |ctx: &Context| self.load_span(ctx, begin, end),
        )?;
        traces.retain(|_, t| t.has_data());

        let tile = Tile::new(commits, traces);
        if !tile.is_aligned() {
            return Err(Error::Internal("tile traces do not match its commits".into()));
        }
        debug!(commits = tile.commits.len(), traces = tile.traces.len(), "assembled tile");
        let commits = tile.commits.clone();
        Ok((tile, commits))
    }

    fn get_dense_tile(&self, ctx: &Context, n_commits: usize) -> Result<(Tile, Vec<Commit>)> {
        let ctx = ctx.with_timeout(self.config.read_timeout());
        let newest = self.vcs.last_n_index(&ctx, 1)?.pop().ok_or(Error::NoCommits)?.index;
        if n_commits == 0 {
            return Ok((Tile::default(), Vec::new()));
        }

        let tile_size = self.config.tile_size;
        let mut tile_index = newest / tile_size;
        let mut traces = TraceMap::new();
        let mut indices: Vec<usize> = Vec::new();
        let mut scanned = 0;

        loop {
            let tile = self.load_tile(&ctx, TileKey::from_index(tile_index as i64))?;
            scanned += 1;

            let tile_begin = tile_index * tile_size;
            // Slots past the newest commit cannot hold data yet.
            let valid = tile_size.min(newest + 1 - tile_begin);
            let mut offsets = tile.commit_indices_with_data(valid);
            let need = n_commits - indices.len();
            if offsets.len() > need {
                offsets.drain(..offsets.len() - need);
            }

            let segment = tile.make_from_commit_indexes(&offsets);
            traces.prepend_traces_with_len(&segment, offsets.len(), indices.len());
            let mut older: Vec<usize> = offsets.iter().map(|o| tile_begin + o).collect();
            older.append(&mut indices);
            indices = older;

            if indices.len() >= n_commits || tile_index == 0 || scanned >= self.config.max_tiles_for_dense_tile {
                break;
            }
            tile_index -= 1;
        }
        traces.retain(|_, t| t.has_data());

        let Some(&oldest) = indices.first() else {
            debug!(scanned, "no commits with data");
            return Ok((Tile::default(), Vec::new()));
        };
        let span = self.vcs.range(&ctx, oldest, newest + 1)?;
        if span.len() != newest + 1 - oldest {
            return Err(Error::Internal(format!(
                "vcs returned {} commits for indices {}..={}",
                span.len(),
                oldest,
                newest
            )));
        }
        let hashes: Vec<String> = span.into_iter().map(|c| c.hash).collect();
        let all_commits = self.vcs.details(&ctx, &hashes)?;
        let dense_commits = indices.iter().map(|i| all_commits[i - oldest].clone()).collect();

        let tile = Tile::new(dense_commits, traces);
        if !tile.is_aligned() {
            return Err(Error::Internal("dense tile traces do not match its commits".into()));
        }
        debug!(
            scanned,
            commits = tile.commits.len(),
            traces = tile.traces.len(),
            span = all_commits.len(),
            "assembled dense tile"
        );
        Ok((tile, all_commits))
    }
}
