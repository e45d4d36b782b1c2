//! Error types for the agent crate

use agent_relay_providers::ProviderError;
use thiserror::Error;

/// Errors that end an execution loop or the routing loop
#[derive(Error, Debug)]
pub enum Error {
    /// The model backend failed
    #[error("backend error: {0}")]
    Provider(#[from] ProviderError),

    /// Bus, config or I/O failure from the core crate
    #[error(transparent)]
    Core(#[from] agent_relay_core::Error),

    /// An agent or trigger could not be built
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized Result type for agent operations
pub type Result<T> = std::result::Result<T, Error>;
