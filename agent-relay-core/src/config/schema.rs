//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for agent-relay
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Model backend configuration
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Values used by agents that don't set their own
    #[serde(default)]
    pub defaults: AgentDefaults,
    /// Agents to register, in order
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    /// Triggers to start alongside the orchestrator
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    /// Routing loop behaviour
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Event log sink
    #[serde(default)]
    pub event_log: EventLogConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Find an agent definition by name
    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Default agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDefaults {
    /// Default model
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum think-act cycles per trigger message
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Directory the filesystem tools are confined to when restricted
    #[serde(default = "default_workspace")]
    pub workspace: String,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_max_iterations() -> u32 {
    10
}

fn default_workspace() -> String {
    "~/.agent-relay/workspace".to_string()
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_iterations: default_max_iterations(),
            workspace: default_workspace(),
        }
    }
}

/// One agent definition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Builtin tool names
    #[serde(default)]
    pub tools: Vec<String>,
    /// Confine filesystem tools to the workspace
    #[serde(default)]
    pub restrict_to_workspace: bool,
    /// Address final answers here instead of back to the sender
    #[serde(default)]
    pub reply_to: Option<String>,
}

impl AgentConfig {
    /// Model after applying defaults
    pub fn resolved_model(&self, defaults: &AgentDefaults) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| defaults.model.clone())
    }

    /// Iteration budget after applying defaults
    pub fn resolved_max_iterations(&self, defaults: &AgentDefaults) -> u32 {
        self.max_iterations.unwrap_or(defaults.max_iterations)
    }
}

/// Trigger definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Send `prompt` to `agent` every `interval_s` seconds
    Timer {
        agent: String,
        interval_s: f64,
        #[serde(default)]
        prompt: Option<String>,
    },
    /// Send the contents of `path` to `agent` whenever it changes
    FileWatch {
        agent: String,
        path: String,
        #[serde(default)]
        poll_s: Option<f64>,
    },
}

impl TriggerConfig {
    /// Agent the trigger targets
    pub fn agent(&self) -> &str {
        match self {
            TriggerConfig::Timer { agent, .. } | TriggerConfig::FileWatch { agent, .. } => agent,
        }
    }
}

/// What the routing loop does when the model backend fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorPolicy {
    /// Tell the original sender and keep routing
    #[default]
    Reply,
    /// Stop the routing loop and return the error
    Halt,
}

/// Routing loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub on_backend_error: BackendErrorPolicy,
}

/// Event log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// JSONL file to append to
    #[serde(default)]
    pub path: Option<String>,
    /// Echo each event through the logger
    #[serde(default = "default_true")]
    pub echo: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            path: None,
            echo: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_config_tagged() {
        let timer: TriggerConfig = serde_json::from_str(
            r#"{"type":"timer","agent":"assistant","interval_s":30}"#,
        )
        .unwrap();
        assert_eq!(
            timer,
            TriggerConfig::Timer {
                agent: "assistant".to_string(),
                interval_s: 30.0,
                prompt: None,
            }
        );

        let watch: TriggerConfig = serde_json::from_str(
            r#"{"type":"file_watch","agent":"assistant","path":"notes.md","poll_s":2.5}"#,
        )
        .unwrap();
        assert_eq!(watch.agent(), "assistant");
    }

    #[test]
    fn test_agent_config_defaults() {
        let defaults = AgentDefaults::default();
        let agent: AgentConfig = serde_json::from_str(r#"{"name":"writer"}"#).unwrap();
        assert_eq!(agent.resolved_model(&defaults), "gpt-4o");
        assert_eq!(agent.resolved_max_iterations(&defaults), 10);
        assert!(agent.tools.is_empty());

        let agent: AgentConfig =
            serde_json::from_str(r#"{"name":"writer","model":"gpt-4o-mini","max_iterations":3}"#)
                .unwrap();
        assert_eq!(agent.resolved_model(&defaults), "gpt-4o-mini");
        assert_eq!(agent.resolved_max_iterations(&defaults), 3);
    }

    #[test]
    fn test_backend_error_policy_serde() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"on_backend_error":"halt"}"#).unwrap();
        assert_eq!(config.on_backend_error, BackendErrorPolicy::Halt);
        assert_eq!(
            OrchestratorConfig::default().on_backend_error,
            BackendErrorPolicy::Reply
        );
    }
}
