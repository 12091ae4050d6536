//! Error taxonomy for parameter search and validation.
//!
//! Mirrors `btfast_core::Error`'s fatal/non-fatal split (spec §7): a
//! degenerate GA (zero total fitness) or an empty metric vector in a
//! validation step are fatal, with a diagnostic attached; a worker
//! propagating a `btfast_core::Error` aborts the whole batch, since no
//! operation here recovers from a single replay's failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("engine error: {0}")]
    Engine(#[from] btfast_core::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("runtime degenerate condition: {0}")]
    RuntimeDegenerate(String),

    #[error("result I/O error: {0}")]
    ResultIo(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
