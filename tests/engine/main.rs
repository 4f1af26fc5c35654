//! Trace store engine, end to end through the `Gold` entry point.
//!
//! ```bash
//! cargo test --test engine
//! cargo test --test engine dense::
//! ```

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod dense;
mod put_get;
