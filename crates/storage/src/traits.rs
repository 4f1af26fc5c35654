//! The store contract

use crate::error::Result;
use crate::model::{CondMutation, Mutation, Row};
use gold_concurrency::Context;

/// A BigTable-like wide-column store
///
/// Rows are addressed by string keys and hold cells in column families.
/// Each cell keeps versions by caller-supplied timestamp; reads return the
/// latest version of each column.
///
/// Implementations must be safe to share across threads and must check the
/// context on every call. Conditional mutations must be linearizable at row
/// granularity: this is what the param-set update protocol relies on to
/// avoid lost updates between concurrent writers.
pub trait BigTable: Send + Sync {
    /// Create a table. Fails with `AlreadyExists` if present.
    fn create_table(&self, ctx: &Context, table: &str) -> Result<()>;

    /// Create a column family retaining at most `max_versions` versions per
    /// cell. Fails with `AlreadyExists` if present.
    fn create_column_family(&self, ctx: &Context, table: &str, family: &str, max_versions: usize) -> Result<()>;

    /// Apply `mutations[i]` to row `rows[i]` for every `i`
    ///
    /// Each row is applied atomically; rows are independent of each other.
    fn apply_bulk(&self, ctx: &Context, table: &str, rows: &[String], mutations: &[Vec<Mutation>]) -> Result<()>;

    /// Atomically evaluate a predicate on a row and apply one branch
    ///
    /// Returns whether the predicate matched.
    fn check_and_mutate(&self, ctx: &Context, table: &str, row: &str, mutation: &CondMutation) -> Result<bool>;

    /// Read a single row, optionally restricted to one family
    ///
    /// Returns `None` if the row has no cells (in that family).
    fn read_row(&self, ctx: &Context, table: &str, row: &str, family: Option<&str>) -> Result<Option<Row>>;

    /// Read every row whose key starts with `prefix`, in key order
    fn read_prefix(&self, ctx: &Context, table: &str, prefix: &str, family: Option<&str>) -> Result<Vec<Row>>;
}

impl<T: BigTable + ?Sized> BigTable for std::sync::Arc<T> {
    fn create_table(&self, ctx: &Context, table: &str) -> Result<()> {
        (**self).create_table(ctx, table)
    }

    fn create_column_family(&self, ctx: &Context, table: &str, family: &str, max_versions: usize) -> Result<()> {
        (**self).create_column_family(ctx, table, family, max_versions)
    }

    fn apply_bulk(&self, ctx: &Context, table: &str, rows: &[String], mutations: &[Vec<Mutation>]) -> Result<()> {
        (**self).apply_bulk(ctx, table, rows, mutations)
    }

    fn check_and_mutate(&self, ctx: &Context, table: &str, row: &str, mutation: &CondMutation) -> Result<bool> {
        (**self).check_and_mutate(ctx, table, row, mutation)
    }

    fn read_row(&self, ctx: &Context, table: &str, row: &str, family: Option<&str>) -> Result<Option<Row>> {
        (**self).read_row(ctx, table, row, family)
    }

    fn read_prefix(&self, ctx: &Context, table: &str, prefix: &str, family: Option<&str>) -> Result<Vec<Row>> {
        (**self).read_prefix(ctx, table, prefix, family)
    }
}
