//! Agent definition: identity, instructions and tools

use std::sync::Arc;

use agent_relay_core::config::{AgentConfig, AgentDefaults};
use agent_relay_core::utils::{ensure_dir, expand_tilde};
use agent_relay_tools::{builtin_tool, Tool, ToolRegistry};
use serde_json::Value;

use crate::error::{Error, Result};

/// Model used when an agent doesn't name one
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Think-act cycles allowed per trigger message
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// An agent is a name, standing instructions and the tools it may call
///
/// Agents hold no per-conversation state, so one agent can serve any
/// number of trigger messages one after another.
#[derive(Clone)]
pub struct Agent {
    name: String,
    instructions: String,
    tools: ToolRegistry,
    model: String,
    max_iterations: u32,
    reply_to: Option<String>,
}

impl Agent {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            tools: ToolRegistry::new(),
            model: DEFAULT_MODEL.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            reply_to: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Add a tool, replacing any tool of the same name
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    /// Send final answers to `name` instead of back to whoever triggered the agent
    pub fn with_reply_to(mut self, name: impl Into<String>) -> Self {
        self.reply_to = Some(name.into());
        self
    }

    /// Build an agent from its config entry
    ///
    /// Builtin tools are confined to the default workspace when the entry
    /// asks for it; the workspace is created if missing.
    pub fn from_config(config: &AgentConfig, defaults: &AgentDefaults) -> Result<Self> {
        let allowed_dir = if config.restrict_to_workspace {
            let workspace = expand_tilde(&defaults.workspace);
            Some(ensure_dir(&workspace).map_err(agent_relay_core::Error::from)?)
        } else {
            None
        };

        let mut agent = Agent::new(config.name.trim(), config.instructions.clone())
            .with_model(config.resolved_model(defaults))
            .with_max_iterations(config.resolved_max_iterations(defaults));

        for name in &config.tools {
            let tool = builtin_tool(name, allowed_dir.clone()).ok_or_else(|| {
                Error::Config(format!("agent '{}': unknown tool '{}'", config.name, name))
            })?;
            agent = agent.with_tool(tool);
        }

        if let Some(target) = config.reply_to.as_deref().map(str::trim) {
            if !target.is_empty() {
                agent = agent.with_reply_to(target);
            }
        }

        Ok(agent)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Look up a tool by exact name
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Tool schemas for the backend, `None` when the agent has no tools
    pub fn tool_schemas(&self) -> Option<Vec<Value>> {
        if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.get_definitions())
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("max_iterations", &self.max_iterations)
            .field("tools", &self.tools.tool_names())
            .field("reply_to", &self.reply_to)
            .finish()
    }
}
