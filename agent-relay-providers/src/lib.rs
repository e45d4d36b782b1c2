//! Model backend integrations for agent-relay
//!
//! This crate provides the chat types exchanged with a model backend, the
//! [`LLMProvider`] trait the execution loop talks to, and an HTTP client for
//! any OpenAI-compatible `chat/completions` endpoint.

pub mod base;
pub mod openai;

pub use base::{
    ChatMessage, LLMProvider, LLMResponse, ProviderError, ProviderResult, ToolCallRequest,
};
pub use openai::OpenAICompatClient;
