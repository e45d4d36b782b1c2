//! Orchestrator: routes bus messages to agents by name

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use agent_relay_core::bus::{Event, EventKind, Message, MessageBus};
use agent_relay_core::config::{find_reply_cycle, BackendErrorPolicy, Config, TriggerConfig};
use agent_relay_core::event_log::EventSink;
use agent_relay_core::trigger::{FileWatchTrigger, TimerTrigger, Trigger};
use agent_relay_core::utils::{expand_tilde, prefix_chars};
use agent_relay_providers::LLMProvider;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agent::Agent;
use crate::agent_loop::run_loop;
use crate::error::{Error, Result};

const ROUTED_PREVIEW_CHARS: usize = 200;

/// Cloneable handle for stopping a running orchestrator from elsewhere
#[derive(Clone)]
pub struct OrchestratorHandle {
    cancel: CancellationToken,
}

impl OrchestratorHandle {
    /// Ask the routing loop to exit
    ///
    /// An idle wait for the next message is interrupted; an agent loop that
    /// is already running finishes first.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Stops and aborts trigger tasks when the routing loop ends, however it ends
struct TriggerTasks {
    running: Vec<(Arc<dyn Trigger>, JoinHandle<()>)>,
}

impl Drop for TriggerTasks {
    fn drop(&mut self) {
        for (trigger, task) in &self.running {
            trigger.stop();
            task.abort();
        }
        debug!("Stopped {} trigger(s)", self.running.len());
    }
}

/// Single control loop that owns the agents and serializes their execution
///
/// Only one agent loop runs at a time: the orchestrator is the sole consumer
/// of the bus's inbound queue and doesn't take the next message until the
/// current one is fully handled.
pub struct Orchestrator {
    bus: MessageBus,
    provider: Arc<dyn LLMProvider>,
    events: Arc<dyn EventSink>,
    agents: HashMap<String, Arc<Agent>>,
    triggers: Vec<Arc<dyn Trigger>>,
    on_backend_error: BackendErrorPolicy,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        bus: MessageBus,
        provider: Arc<dyn LLMProvider>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            bus,
            provider,
            events,
            agents: HashMap::new(),
            triggers: Vec::new(),
            on_backend_error: BackendErrorPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Build an orchestrator with every agent and trigger from `config`
    pub fn from_config(
        config: &Config,
        bus: MessageBus,
        provider: Arc<dyn LLMProvider>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let mut orchestrator = Self::new(bus, provider, events)
            .with_backend_error_policy(config.orchestrator.on_backend_error);

        for agent_config in &config.agents {
            orchestrator.add_agent(Agent::from_config(agent_config, &config.defaults)?);
        }

        for trigger_config in &config.triggers {
            let trigger: Arc<dyn Trigger> = match trigger_config {
                TriggerConfig::Timer {
                    agent,
                    interval_s,
                    prompt,
                } => {
                    let mut timer = TimerTrigger::every_secs(agent.trim(), *interval_s)?;
                    if let Some(prompt) = prompt {
                        timer = timer.with_prompt(prompt.clone());
                    }
                    Arc::new(timer)
                }
                TriggerConfig::FileWatch {
                    agent,
                    path,
                    poll_s,
                } => {
                    let path: PathBuf = expand_tilde(path);
                    let mut watch = FileWatchTrigger::new(agent.trim(), path);
                    if let Some(poll) = poll_s {
                        watch = watch.with_poll_secs(*poll)?;
                    }
                    Arc::new(watch)
                }
            };
            orchestrator.add_trigger(trigger);
        }

        Ok(orchestrator)
    }

    /// Choose what happens when the model backend fails mid-loop
    pub fn with_backend_error_policy(mut self, policy: BackendErrorPolicy) -> Self {
        self.on_backend_error = policy;
        self
    }

    /// Register an agent, replacing any agent with the same name
    pub fn add_agent(&mut self, agent: Agent) {
        let name = agent.name().to_string();
        if self.agents.insert(name.clone(), Arc::new(agent)).is_some() {
            debug!("Replaced agent '{}'", name);
        }
    }

    /// Register a trigger to start with the next `run`
    pub fn add_trigger(&mut self, trigger: Arc<dyn Trigger>) {
        self.triggers.push(trigger);
    }

    pub fn agent(&self, name: &str) -> Option<&Arc<Agent>> {
        self.agents.get(name)
    }

    /// Registered agent names, sorted
    pub fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn triggers(&self) -> &[Arc<dyn Trigger>] {
        &self.triggers
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Ask the routing loop to exit, see [`OrchestratorHandle::stop`]
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Start the triggers and route messages until stopped
    ///
    /// Triggers are stopped and their tasks aborted, in registration order,
    /// whenever this returns or the future is dropped.
    ///
    /// Fails before starting anything if the agents' `reply_to` links form
    /// a cycle of three or more, since such a hand-off never ends.
    pub async fn run(&self) -> Result<()> {
        let links = self
            .agents
            .iter()
            .filter_map(|(name, agent)| agent.reply_to().map(|target| (name.as_str(), target)));
        if let Some(cycle) = find_reply_cycle(links) {
            return Err(Error::Config(format!(
                "reply_to cycle never ends: {}",
                cycle.join(" -> ")
            )));
        }

        let _triggers = self.start_triggers();
        info!(
            "Orchestrator running with {} agent(s) and {} trigger(s)",
            self.agents.len(),
            self.triggers.len()
        );

        loop {
            let message = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                message = self.bus.receive() => message?,
            };

            self.route(message).await?;
        }

        info!("Orchestrator stopped");
        Ok(())
    }

    fn start_triggers(&self) -> TriggerTasks {
        let running = self
            .triggers
            .iter()
            .map(|trigger| {
                let task = {
                    let trigger = Arc::clone(trigger);
                    let bus = self.bus.clone();
                    let events = Arc::clone(&self.events);
                    tokio::spawn(async move { trigger.start(bus, events).await })
                };
                (Arc::clone(trigger), task)
            })
            .collect();
        TriggerTasks { running }
    }

    /// Handle one inbound message to completion
    async fn route(&self, message: Message) -> Result<()> {
        self.events.record(
            Event::system(EventKind::MessageRouted)
                .with_data("from", message.sender.clone())
                .with_data("to", message.to.clone())
                .with_data(
                    "content",
                    prefix_chars(&message.content, ROUTED_PREVIEW_CHARS),
                ),
        );

        let Some(agent) = self.agents.get(&message.to).cloned() else {
            warn!(
                "No agent named '{}' (message from '{}')",
                message.to, message.sender
            );
            self.bus.reply(Message::system(
                &message.sender,
                format!("No agent named '{}'", message.to),
            ))?;
            return Ok(());
        };

        let response =
            match run_loop(&agent, &message, self.provider.as_ref(), self.events.as_ref()).await {
                Ok(response) => response,
                Err(e) => match self.on_backend_error {
                    BackendErrorPolicy::Halt => {
                        error!("Agent '{}' failed, halting: {}", agent.name(), e);
                        return Err(e);
                    }
                    BackendErrorPolicy::Reply => {
                        error!("Agent '{}' failed: {}", agent.name(), e);
                        self.bus.reply(Message::system(
                            &message.sender,
                            format!("Agent '{}' failed: {}", agent.name(), e),
                        ))?;
                        return Ok(());
                    }
                },
            };

        let forward = response.to != message.sender && self.agents.contains_key(&response.to);
        self.bus.reply(response.clone())?;
        if forward {
            debug!("Forwarding '{}' -> '{}'", response.sender, response.to);
            self.bus.send(response)?;
        }
        Ok(())
    }
}
