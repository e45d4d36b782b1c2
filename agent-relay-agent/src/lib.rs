//! Agent logic for agent-relay
//!
//! This crate provides the agent definition, the think-act-observe execution
//! loop and the orchestrator that routes bus messages between agents.

pub mod agent;
pub mod agent_loop;
pub mod context;
pub mod error;
pub mod orchestrator;

pub use agent::{Agent, DEFAULT_MAX_ITERATIONS, DEFAULT_MODEL};
pub use agent_loop::{run_loop, ITERATION_LIMIT_REPLY};
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, OrchestratorHandle};
