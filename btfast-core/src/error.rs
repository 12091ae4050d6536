//! Error taxonomy for the engine.
//!
//! Four kinds are fatal (spec §7): `Configuration`, `Data`, `ContractViolation`,
//! `RuntimeDegenerate`. "Non-ready" conditions (insufficient bar history, an
//! unfilled order) are never errors — callers see `Ok(None)` or simply skip
//! the bar.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("runtime degenerate condition: {0}")]
    RuntimeDegenerate(String),
}

pub type Result<T> = std::result::Result<T, Error>;
