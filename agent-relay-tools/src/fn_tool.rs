//! Tools backed by an async closure

use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::base::{Result, Tool};

type Handler = Box<dyn Fn(Value) -> BoxFuture<'static, Result<String>> + Send + Sync>;

/// A tool whose behaviour is an async function
///
/// ```ignore
/// let add = FnTool::new(
///     "add",
///     "Add two integers",
///     json!({"type": "object", "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}}, "required": ["a", "b"]}),
///     |args| async move {
///         let a = args["a"].as_i64().unwrap_or_default();
///         let b = args["b"].as_i64().unwrap_or_default();
///         Ok((a + b).to_string())
///     },
/// );
/// ```
pub struct FnTool {
    name: String,
    description: String,
    parameters: Value,
    handler: Handler,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Box::new(move |args| handler(args).boxed()),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        (self.handler)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::ToolError;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_tool_executes_closure() {
        let add = FnTool::new(
            "add",
            "Add two integers",
            json!({"type": "object", "required": ["a", "b"]}),
            |args| async move {
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                Ok((a + b).to_string())
            },
        );

        assert_eq!(add.name(), "add");
        assert_eq!(add.to_schema()["function"]["description"], "Add two integers");
        assert_eq!(add.execute(json!({"a": 2, "b": 40})).await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_fn_tool_propagates_error() {
        let failing = FnTool::new("fail", "Always fails", json!({"type": "object"}), |_| async {
            Err(ToolError::ExecutionFailed("boom".to_string()))
        });

        let err = failing.execute(json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Execution failed: boom");
    }
}
