//! btfast-search — fans `btfast-core`'s single-replay engine out into
//! exhaustive/serial/genetic parameter search and the multi-stage
//! validation pipeline (selection, out-of-sample metrics and consistency,
//! profitability sweep, stability, noise).
//!
//! Every worker here builds its own `Strategy`/`DataFeed`/`Account`
//! instance from a shared read-only `RunContext`; nothing mutable is
//! shared across parallel runs.

pub mod error;
pub mod genetic;
pub mod optimization;
pub mod result;
pub mod result_io;
pub mod stats;
pub mod validation;

pub use error::{Result, SearchError};
pub use optimization::{run_exhaustive_parallel, run_exhaustive_serial, run_one, RunContext, RunOutcome};
pub use result::{FitnessMetric, StrategyResult};
