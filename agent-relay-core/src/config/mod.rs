//! Configuration management
//!
//! Handles loading and validation of agent-relay configuration from files
//! and environment variables.

pub mod loader;
pub mod schema;
pub mod validate;

pub use loader::ConfigLoader;
pub use schema::*;
pub use validate::{find_reply_cycle, validate_config, BUILTIN_TOOLS};
