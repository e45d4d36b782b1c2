//! Error types for agent-relay

use thiserror::Error;

/// Failures of the bus and configuration layers
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file or override that isn't valid JSON for the schema
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// One of the bus queues has no receiver left
    #[error("{0} queue closed")]
    BusClosed(&'static str),

    /// Config that parsed but breaks a rule; all problems joined with "; "
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
