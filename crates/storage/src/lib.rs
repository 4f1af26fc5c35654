//! Wide-column storage for the Gold trace store
//!
//! This crate defines the store contract the engine is written against:
//! - [`BigTable`]: bulk writes, row-scoped conditional mutations, prefix
//!   and single-row reads, table/family admin
//! - [`Mutation`], [`CondMutation`], [`Predicate`]: write operations
//! - [`Row`], [`Cell`]: read results (latest version per column)
//!
//! and one implementation, [`InMemoryBigTable`], used by tests and the
//! simulator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod model;
pub mod sharded;
pub mod traits;

pub use error::{Result, StoreError};
pub use model::{Cell, CondMutation, Mutation, Predicate, Row};
pub use sharded::{InMemoryBigTable, StoreStats};
pub use traits::BigTable;
