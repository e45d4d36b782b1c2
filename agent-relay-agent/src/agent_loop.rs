//! Agent loop: think, act, observe
//!
//! One call turns one trigger message into one response message. Every step
//! is recorded as an [`Event`] so a run can be followed from the event log
//! alone.

use agent_relay_core::bus::{Event, EventKind, Message};
use agent_relay_core::event_log::EventSink;
use agent_relay_core::utils::{prefix_chars, truncate_chars};
use agent_relay_providers::LLMProvider;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::context::ContextBuilder;
use crate::error::Result;

/// Content of the fallback message sent when the iteration budget runs out
pub const ITERATION_LIMIT_REPLY: &str = "I reached my iteration limit.";

const TRIGGER_PREVIEW_CHARS: usize = 200;
const CONTENT_PREVIEW_CHARS: usize = 500;

/// Run one think-act-observe loop for `trigger`
///
/// Tool problems never end the loop: they are fed back to the model as
/// `Error: ...` text. Only a backend failure is returned as an error.
pub async fn run_loop(
    agent: &Agent,
    trigger: &Message,
    provider: &dyn LLMProvider,
    events: &dyn EventSink,
) -> Result<Message> {
    let reply_to = agent.reply_to().unwrap_or(&trigger.sender);
    let mut context = ContextBuilder::new(agent.instructions(), &trigger.content);

    events.record(
        Event::new(EventKind::LoopStart, agent.name()).with_data(
            "trigger",
            prefix_chars(&trigger.content, TRIGGER_PREVIEW_CHARS),
        ),
    );
    debug!(
        "Agent '{}' handling message from '{}': {}",
        agent.name(),
        trigger.sender,
        truncate_chars(&trigger.content, 80)
    );

    let tool_schemas = agent.tool_schemas();

    for iteration in 1..=agent.max_iterations() {
        // THINK
        events.record(
            Event::new(EventKind::LlmCall, agent.name())
                .with_data("iteration", iteration)
                .with_data("message_count", context.len()),
        );

        let response = provider
            .chat(
                agent.model(),
                context.messages().to_vec(),
                tool_schemas.clone(),
            )
            .await?;

        if !response.has_tool_calls() {
            let content = response.content.unwrap_or_default();
            events.record(
                Event::new(EventKind::LlmResponse, agent.name())
                    .with_data("content", prefix_chars(&content, CONTENT_PREVIEW_CHARS)),
            );
            events.record(
                Event::new(EventKind::LoopEnd, agent.name())
                    .with_data("iterations", iteration)
                    .with_data("content", prefix_chars(&content, TRIGGER_PREVIEW_CHARS)),
            );
            info!(
                "Agent '{}' answered '{}' after {} iteration(s)",
                agent.name(),
                reply_to,
                iteration
            );
            return Ok(Message::new(agent.name(), reply_to, content));
        }

        // ACT
        debug!(
            "Agent '{}' requested {} tool call(s)",
            agent.name(),
            response.tool_calls.len()
        );
        let tool_calls = response.tool_calls;
        context.add_assistant_message(response.content, tool_calls.clone());

        for call in &tool_calls {
            events.record(
                Event::new(EventKind::ToolCall, agent.name())
                    .with_data("tool", call.name.clone())
                    .with_data("args", call.arguments.clone())
                    .with_data("iteration", iteration),
            );

            let result = agent.tools().invoke(&call.name, &call.arguments).await;

            // OBSERVE
            events.record(
                Event::new(EventKind::ToolResult, agent.name())
                    .with_data("tool", call.name.clone())
                    .with_data("result", prefix_chars(&result, CONTENT_PREVIEW_CHARS))
                    .with_data("iteration", iteration),
            );
            context.add_tool_result(call.id.clone(), result);
        }
    }

    warn!(
        "Agent '{}' hit its iteration limit ({})",
        agent.name(),
        agent.max_iterations()
    );
    events.record(
        Event::new(EventKind::LoopMaxIterations, agent.name())
            .with_data("iterations", agent.max_iterations()),
    );
    Ok(Message::new(agent.name(), reply_to, ITERATION_LIMIT_REPLY))
}
