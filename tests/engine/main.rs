//! Engine test suite.
//!
//! Drives the classification and aggregation entry points end-to-end against an
//! in-memory store; no database is needed.
//!
//! Run with: cargo test --test engine

mod memory_store;

mod test_finish_spec;
mod test_lifecycle;
mod test_unstable;
