//! Tool registry

use super::base::{Result, Tool, ToolError};
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::warn;

/// Registry of the tools one agent may call
///
/// Tools keep their registration order so the schemas sent to the model are
/// stable from call to call.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, replacing any tool with the same name in place
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by exact name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Get all tool definitions in OpenAI format
    pub fn get_definitions(&self) -> Vec<Value> {
        self.tools.iter().map(|tool| tool.to_schema()).collect()
    }

    /// Run a tool call from the model and always produce result text
    ///
    /// An unknown name, unparseable arguments, missing required fields, a
    /// tool error and a panicking tool all come back as a string starting
    /// with `Error: `.
    pub async fn invoke(&self, name: &str, raw_arguments: &str) -> String {
        let Some(tool) = self.get(name) else {
            return format!("Error: unknown tool '{}'", name);
        };

        match Self::run(tool.as_ref(), raw_arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                format!("Error: {}", e)
            }
        }
    }

    async fn run(tool: &dyn Tool, raw_arguments: &str) -> Result<String> {
        let args = parse_arguments(raw_arguments)?;

        let errors = tool.validate_params(&args);
        if !errors.is_empty() {
            return Err(ToolError::InvalidParams(errors.join("; ")));
        }

        match AssertUnwindSafe(tool.execute(args)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(ToolError::ExecutionFailed(format!(
                "tool '{}' panicked",
                tool.name()
            ))),
        }
    }

    /// Get list of registered tool names
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    /// Get number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Parse raw tool-call arguments into a JSON object
///
/// Backends send `""` for tools without parameters.
fn parse_arguments(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let value: Value =
        serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
    if !value.is_object() {
        return Err(ToolError::InvalidArguments(
            "arguments must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fn_tool::FnTool;
    use async_trait::async_trait;
    use serde_json::json;

    struct MockTool;

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            "mock"
        }

        fn description(&self) -> &str {
            "A mock tool"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"q": {"type": "string"}},
                "required": ["q"]
            })
        }

        async fn execute(&self, args: Value) -> Result<String> {
            Ok(format!("mock result for {}", args["q"].as_str().unwrap_or("?")))
        }
    }

    fn named(name: &str, reply: &'static str) -> Arc<dyn Tool> {
        Arc::new(FnTool::new(name, "test tool", json!({"type": "object"}), move |_| async move {
            Ok(reply.to_string())
        }))
    }

    #[test]
    fn test_register_keeps_order_and_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(named("b", "first b"));
        registry.register(named("a", "a"));
        registry.register(named("b", "second b"));

        assert_eq!(registry.tool_names(), vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get_definitions()[0]["function"]["name"], "b");
    }

    #[tokio::test]
    async fn test_invoke_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool));
        let result = registry.invoke("mock", r#"{"q": "rust"}"#).await;
        assert_eq!(result, "mock result for rust");
    }

    #[tokio::test]
    async fn test_invoke_replaced_tool_uses_latest() {
        let mut registry = ToolRegistry::new();
        registry.register(named("b", "first b"));
        registry.register(named("b", "second b"));
        assert_eq!(registry.invoke("b", "{}").await, "second b");
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("web_search", "{}").await;
        assert_eq!(result, "Error: unknown tool 'web_search'");
    }

    #[tokio::test]
    async fn test_invoke_bad_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool));

        let malformed = registry.invoke("mock", "{not json").await;
        assert!(malformed.starts_with("Error: Invalid arguments:"));

        let not_object = registry.invoke("mock", "[1]").await;
        assert_eq!(
            not_object,
            "Error: Invalid arguments: arguments must be a JSON object"
        );

        let missing = registry.invoke("mock", "").await;
        assert_eq!(
            missing,
            "Error: Invalid parameters: Missing required field: q"
        );
    }

    #[tokio::test]
    async fn test_invoke_tool_failure_and_panic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FnTool::new(
            "fail",
            "Always fails",
            json!({"type": "object"}),
            |_| async { Err(ToolError::ExecutionFailed("disk full".to_string())) },
        )));
        registry.register(Arc::new(FnTool::new(
            "explode",
            "Always panics",
            json!({"type": "object"}),
            |args| async move {
                if args.is_object() {
                    panic!("kaboom");
                }
                Ok(String::new())
            },
        )));

        assert_eq!(
            registry.invoke("fail", "{}").await,
            "Error: Execution failed: disk full"
        );
        assert_eq!(
            registry.invoke("explode", "{}").await,
            "Error: Execution failed: tool 'explode' panicked"
        );
    }
}
