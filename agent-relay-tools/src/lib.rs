//! Tools for agent-relay
//!
//! This crate provides the [`Tool`] contract, the per-agent [`ToolRegistry`]
//! that turns every tool failure into text for the model, closure-backed
//! tools and the builtin filesystem tools.

pub mod base;
pub mod builtin;
pub mod filesystem;
pub mod fn_tool;
pub mod registry;

pub use base::{Tool, ToolError};
pub use builtin::builtin_tool;
pub use filesystem::{ListDirTool, ReadFileTool, WriteFileTool};
pub use fn_tool::FnTool;
pub use registry::ToolRegistry;
