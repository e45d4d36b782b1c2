//! Configuration validation rules.

use std::collections::{BTreeMap, HashSet};

use super::schema::{Config, TriggerConfig};
use crate::bus::{is_reserved_sender, SENDER_USER};
use crate::trigger::{interval_from_secs, MAX_INTERVAL_SECONDS};

/// Tool names agents may list in `tools`
pub const BUILTIN_TOOLS: &[&str] = &["read_file", "write_file", "list_dir"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.defaults.model.trim().is_empty() {
        errors.push("defaults.model must not be empty".to_string());
    }
    if config.defaults.max_iterations == 0 {
        errors.push("defaults.max_iterations must be > 0".to_string());
    }
    if config.defaults.workspace.trim().is_empty() {
        errors.push("defaults.workspace must not be empty".to_string());
    }
    if config.provider.max_tokens == 0 {
        errors.push("provider.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.provider.temperature) {
        errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
    }

    let mut seen = HashSet::new();
    for (idx, agent) in config.agents.iter().enumerate() {
        let name = agent.name.trim();
        if name.is_empty() {
            errors.push(format!("agents[{}].name must not be empty", idx));
            continue;
        }
        if is_reserved_sender(name) {
            errors.push(format!("agents[{}].name '{}' is reserved", idx, name));
        }
        if !seen.insert(name) {
            errors.push(format!("agents[{}].name '{}' is duplicated", idx, name));
        }
        if agent.max_iterations == Some(0) {
            errors.push(format!("agents.{}.max_iterations must be > 0", name));
        }
        for tool in &agent.tools {
            if !BUILTIN_TOOLS.contains(&tool.as_str()) {
                errors.push(format!("agents.{}.tools: unknown tool '{}'", name, tool));
            }
        }
    }

    for agent in &config.agents {
        if let Some(target) = agent.reply_to.as_deref().map(str::trim) {
            if target == agent.name.trim() {
                errors.push(format!("agents.{}.reply_to must not name itself", agent.name));
            } else if target != SENDER_USER && !seen.contains(target) {
                errors.push(format!(
                    "agents.{}.reply_to names unknown agent '{}'",
                    agent.name, target
                ));
            }
        }
    }

    let links = config.agents.iter().filter_map(|agent| {
        agent
            .reply_to
            .as_deref()
            .map(|target| (agent.name.trim(), target.trim()))
    });
    if let Some(cycle) = find_reply_cycle(links) {
        errors.push(format!(
            "agents reply_to cycle never ends: {}",
            cycle.join(" -> ")
        ));
    }

    for (idx, trigger) in config.triggers.iter().enumerate() {
        if !seen.contains(trigger.agent().trim()) {
            errors.push(format!(
                "triggers[{}] targets unknown agent '{}'",
                idx,
                trigger.agent()
            ));
        }
        match trigger {
            TriggerConfig::Timer { interval_s, .. } => {
                if interval_from_secs(*interval_s).is_err() {
                    errors.push(format!(
                        "triggers[{}].interval_s must be > 0 and at most {} seconds",
                        idx, MAX_INTERVAL_SECONDS
                    ));
                }
            }
            TriggerConfig::FileWatch { path, poll_s, .. } => {
                if path.trim().is_empty() {
                    errors.push(format!("triggers[{}].path must not be empty", idx));
                }
                if let Some(poll) = poll_s {
                    if interval_from_secs(*poll).is_err() {
                        errors.push(format!(
                            "triggers[{}].poll_s must be > 0 and at most {} seconds",
                            idx, MAX_INTERVAL_SECONDS
                        ));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

/// Find a `reply_to` cycle of three or more agents
///
/// `links` maps an agent to the agent it hands its replies to. A two-agent
/// loop ends on its own because a reply addressed to the sender is never
/// forwarded. Longer loops forward forever. The returned names start and
/// end with the same agent.
pub fn find_reply_cycle<'a, I>(links: I) -> Option<Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let next: BTreeMap<&str, &str> = links.into_iter().collect();

    for &start in next.keys() {
        let mut path = vec![start];
        let mut current = start;
        while let Some(&target) = next.get(current) {
            if let Some(pos) = path.iter().position(|name| *name == target) {
                let cycle = &path[pos..];
                if cycle.len() > 2 {
                    let mut names: Vec<String> = cycle.iter().map(|n| n.to_string()).collect();
                    names.push(target.to_string());
                    return Some(names);
                }
                break;
            }
            path.push(target);
            current = target;
        }
    }
    None
}
