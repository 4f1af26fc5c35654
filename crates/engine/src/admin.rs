//! Table bootstrap

use crate::config::TraceStoreConfig;
use crate::error::Result;
use crate::keys::{FAMILY_OPS, FAMILY_OPTIONS, FAMILY_TRACE};
use gold_concurrency::Context;
use gold_storage::{BigTable, StoreError};
use tracing::info;

/// Create the table and its column families if they do not exist
///
/// Every family keeps a single version per cell. Safe to run on every
/// start-up.
pub fn init_bigtable(ctx: &Context, store: &dyn BigTable, config: &TraceStoreConfig) -> Result<()> {
    let ctx = ctx.with_timeout(config.write_timeout());
    let table = config.table.as_str();

    if created(store.create_table(&ctx, table))? {
        info!(table, "created table");
    }
    for family in [FAMILY_OPS, FAMILY_TRACE, FAMILY_OPTIONS] {
        if created(store.create_column_family(&ctx, table, family, 1))? {
            info!(table, family, "created column family");
        }
    }
    Ok(())
}

fn created(result: std::result::Result<(), StoreError>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.is_already_exists() => Ok(false),
        Err(e) => Err(e.into()),
    }
}
