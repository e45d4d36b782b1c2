//! Conversation context for one execution loop

use agent_relay_providers::{ChatMessage, ToolCallRequest};

/// Builds the ordered list of role-tagged items sent to the backend
///
/// A context lives for exactly one trigger message; nothing carries over
/// between loops.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    messages: Vec<ChatMessage>,
}

impl ContextBuilder {
    /// Seed a context with the agent's instructions and the trigger content
    pub fn new(instructions: &str, trigger_content: &str) -> Self {
        Self {
            messages: vec![
                ChatMessage::system(instructions),
                ChatMessage::user(trigger_content),
            ],
        }
    }

    /// Items collected so far
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of items in the context
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Add an assistant message with the tool calls it requested
    pub fn add_assistant_message(
        &mut self,
        content: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
    ) {
        self.messages.push(ChatMessage::assistant_with_tools(
            content.unwrap_or_default(),
            tool_calls,
        ));
    }

    /// Add a tool result linked to the invocation that produced it
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, result: impl Into<String>) {
        self.messages.push(ChatMessage::tool(result, tool_call_id));
    }
}
