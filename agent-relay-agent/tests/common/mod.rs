//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use agent_relay_core::bus::{Message, MessageBus, Subscription};
use agent_relay_core::event_log::EventLog;
use agent_relay_providers::{
    ChatMessage, LLMProvider, LLMResponse, ProviderResult, ToolCallRequest,
};
use async_trait::async_trait;
use parking_lot::Mutex;

/// One request as the provider saw it
#[derive(Debug, Clone)]
pub struct Request {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<serde_json::Value>>,
}

impl Request {
    /// Instructions of the agent that made the request
    pub fn instructions(&self) -> &str {
        &self.messages[0].content
    }
}

/// Replays canned responses in order; once empty, repeats `fallback`
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ProviderResult<LLMResponse>>>,
    fallback: Box<dyn Fn() -> LLMResponse + Send + Sync>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ProviderResult<LLMResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: Box::new(|| LLMResponse::text("")),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every call with the same response
    pub fn always(response: LLMResponse) -> Self {
        let mut provider = Self::new(Vec::new());
        provider.fallback = Box::new(move || response.clone());
        provider
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<serde_json::Value>>,
    ) -> ProviderResult<LLMResponse> {
        self.requests.lock().push(Request {
            model: model.to_string(),
            messages,
            tools,
        });
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok((self.fallback)()))
    }
}

pub fn text(content: &str) -> ProviderResult<LLMResponse> {
    Ok(LLMResponse::text(content))
}

pub fn call(id: &str, name: &str, args: &str) -> LLMResponse {
    LLMResponse::with_tool_calls(None, vec![ToolCallRequest::new(id, name, args)])
}

pub fn quiet_log() -> Arc<EventLog> {
    Arc::new(EventLog::in_memory().with_echo(false))
}

/// Wait for the next published message
pub async fn next(sub: &mut Subscription) -> Message {
    tokio::time::timeout(Duration::from_secs(2), sub.recv())
        .await
        .expect("timed out waiting for a reply")
        .expect("bus dropped")
}

/// Assert nothing more is published for a short while
pub async fn assert_quiet(sub: &mut Subscription) {
    let extra = tokio::time::timeout(Duration::from_millis(50), sub.recv()).await;
    assert!(extra.is_err(), "unexpected message: {:?}", extra);
}

/// Send a user message and return the subscription watching for replies
pub fn seed(bus: &MessageBus, to: &str, content: &str) -> Subscription {
    let sub = bus.subscribe();
    bus.send(Message::from_user(to, content)).unwrap();
    sub
}
