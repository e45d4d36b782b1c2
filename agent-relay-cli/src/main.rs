//! CLI entry point for agent-relay

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use agent_relay_agent::Orchestrator;
use agent_relay_core::bus::{Message, MessageBus, SENDER_SYSTEM, SENDER_USER};
use agent_relay_core::config::{AgentConfig, Config, ConfigLoader, TriggerConfig};
use agent_relay_core::event_log::{EventLog, EventSink};
use agent_relay_core::logging::init_logging;
use agent_relay_core::utils::{ensure_dir, expand_tilde};
use agent_relay_providers::{LLMProvider, OpenAICompatClient};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "agent-relay")]
#[command(about = "Run small teams of tool-using agents over a shared message bus")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration
    Init {
        /// Overwrite an existing config.json
        #[arg(short, long)]
        force: bool,
    },
    /// Start the orchestrator and its triggers until Ctrl-C
    Run {
        /// Agent to send the first message to
        #[arg(short, long)]
        to: Option<String>,
        /// First message, sent as the user
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Send one message and print the answer addressed to the user
    Ask {
        /// Message to send
        message: String,
        /// Agent to ask
        #[arg(short, long)]
        to: Option<String>,
        /// Give up after this many seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
    /// Show the resolved agents and triggers
    Status {
        /// Print the resolved configuration as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the configuration without running anything
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Init { force } => run_init(&loader, force),
        Commands::Run { to, message } => run_orchestrator(&loader, to, message).await,
        Commands::Ask { message, to, timeout } => {
            run_ask(&loader, &message, to, Duration::from_secs(timeout)).await
        }
        Commands::Status { json } => run_status(&loader, json),
        Commands::Validate => run_validate(&loader),
    }
}

/// A single assistant with read-only workspace tools
fn starter_config() -> Config {
    let mut config = Config::default();
    config.agents.push(AgentConfig {
        name: "assistant".to_string(),
        instructions: "You are a helpful assistant. Answer concisely.".to_string(),
        tools: vec!["read_file".to_string(), "list_dir".to_string()],
        restrict_to_workspace: true,
        ..Default::default()
    });
    config
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_path();
    if config_path.exists() && !force {
        println!(
            "Configuration already exists at {} (use --force to overwrite)",
            config_path.display()
        );
        return Ok(());
    }

    let config = starter_config();
    loader.save(&config)?;
    ensure_dir(expand_tilde(&config.defaults.workspace))?;

    println!("{}", style("Configuration saved").green().bold());
    println!("Config location: {}", config_path.display());
    println!(
        "\nSet {} (or provider.api_key), then try:",
        style("OPENAI_API_KEY").cyan()
    );
    println!("  {}", style("agent-relay ask 'Hello!'").cyan());
    Ok(())
}

/// Load config and start logging; the guard must outlive the command
fn load_for_running(loader: &ConfigLoader) -> Result<(Config, WorkerGuard)> {
    let mut config = loader
        .load()
        .with_context(|| format!("loading {}", loader.config_path().display()))?;
    config.logging.dir = resolve_in(loader.config_dir(), &config.logging.dir)
        .to_string_lossy()
        .into_owned();
    let guard = init_logging(&config.logging);

    if config.provider.api_key.is_empty() {
        warn!("No API key configured, requests will be sent without authorization");
    }
    Ok((config, guard))
}

/// Relative paths in config are taken from the config directory
fn resolve_in(base: &Path, path: &str) -> PathBuf {
    let expanded = expand_tilde(path);
    if expanded.is_relative() {
        base.join(expanded)
    } else {
        expanded
    }
}

fn build_orchestrator(config: &Config, bus: MessageBus) -> Result<Arc<Orchestrator>> {
    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAICompatClient::new(&config.provider));
    let events: Arc<dyn EventSink> = Arc::new(EventLog::from_config(&config.event_log));
    let orchestrator = Orchestrator::from_config(config, bus, provider, events)?;
    Ok(Arc::new(orchestrator))
}

/// Pick the agent a user message goes to
///
/// Without `--to` the only configured agent is used.
fn resolve_target(config: &Config, to: Option<String>) -> Result<String> {
    if let Some(to) = to {
        if config.agent(&to).is_none() {
            bail!("No agent named '{}' in the configuration", to);
        }
        return Ok(to);
    }
    match config.agents.as_slice() {
        [only] => Ok(only.name.clone()),
        [] => bail!("No agents configured"),
        _ => bail!("Several agents configured, pick one with --to"),
    }
}

fn print_reply(reply: &Message) {
    let sender = if reply.sender == SENDER_SYSTEM {
        style(reply.sender.as_str()).yellow().bold()
    } else {
        style(reply.sender.as_str()).cyan().bold()
    };
    println!("\n{} {}", sender, style(format!("-> {}", reply.to)).dim());
    println!("{}", reply.content);
}

async fn run_orchestrator(
    loader: &ConfigLoader,
    to: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let (config, _guard) = load_for_running(loader)?;
    let bus = MessageBus::new();
    let orchestrator = build_orchestrator(&config, bus.clone())?;
    let handle = orchestrator.handle();

    if let Some(content) = message {
        let target = resolve_target(&config, to)?;
        bus.send(Message::from_user(target, content))?;
    } else if to.is_some() {
        warn!("--to has no effect without --message");
    }

    if orchestrator.triggers().is_empty() && orchestrator.agent_names().is_empty() {
        println!("Nothing to run: no agents or triggers configured");
        return Ok(());
    }

    println!(
        "{} {} agent(s), {} trigger(s). Press Ctrl-C to stop.",
        style("agent-relay running:").green().bold(),
        orchestrator.agent_names().len(),
        orchestrator.triggers().len()
    );

    let mut routing = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run().await })
    };

    loop {
        tokio::select! {
            result = &mut routing => {
                result??;
                return Ok(());
            }
            reply = bus.next_reply() => {
                let reply = reply?;
                if reply.to == SENDER_USER {
                    print_reply(&reply);
                } else {
                    info!("{} -> {}: {} chars", reply.sender, reply.to, reply.content.chars().count());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, stopping");
                handle.stop();
                break;
            }
        }
    }

    routing.await??;
    Ok(())
}

async fn run_ask(
    loader: &ConfigLoader,
    message: &str,
    to: Option<String>,
    timeout: Duration,
) -> Result<()> {
    let (mut config, _guard) = load_for_running(loader)?;
    // one-shot: no background triggers
    config.triggers.clear();
    let target = resolve_target(&config, to)?;

    let bus = MessageBus::new();
    let orchestrator = build_orchestrator(&config, bus.clone())?;
    let handle = orchestrator.handle();
    bus.send(Message::from_user(&target, message))?;

    let mut routing = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run().await })
    };
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            result = &mut routing => {
                result??;
                bail!("Orchestrator stopped before answering");
            }
            reply = bus.next_reply() => {
                let reply = reply?;
                if reply.to == SENDER_USER {
                    break Ok(reply);
                }
                println!(
                    "{}",
                    style(format!("{} -> {}", reply.sender, reply.to)).dim()
                );
            }
            _ = &mut deadline => {
                break Err(anyhow::anyhow!("No answer for the user within {:?}", timeout));
            }
            _ = tokio::signal::ctrl_c() => {
                break Err(anyhow::anyhow!("Interrupted"));
            }
        }
    };

    handle.stop();
    routing.await??;

    let reply = outcome?;
    print_reply(&reply);
    Ok(())
}

fn run_status(loader: &ConfigLoader, json: bool) -> Result<()> {
    let mut config = loader.load()?;

    if json {
        if !config.provider.api_key.is_empty() {
            config.provider.api_key = "***".to_string();
        }
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", style("agent-relay status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config file: {}", loader.config_path().display());
    println!("  Workspace: {}", config.defaults.workspace);
    println!("  Default model: {}", config.defaults.model);
    println!(
        "  On backend error: {:?}",
        config.orchestrator.on_backend_error
    );
    println!();

    println!("{}", style("Provider:").bold());
    println!("  Endpoint: {}", config.provider.api_base);
    let key_status = if config.provider.api_key.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", key_status);
    println!();

    println!("{}", style("Agents:").bold());
    if config.agents.is_empty() {
        println!("  {}", style("none").dim());
    }
    for agent in &config.agents {
        println!(
            "  {} ({}, max {} iterations)",
            style(&agent.name).cyan(),
            agent.resolved_model(&config.defaults),
            agent.resolved_max_iterations(&config.defaults)
        );
        if !agent.tools.is_empty() {
            let scope = if agent.restrict_to_workspace {
                " [workspace only]"
            } else {
                ""
            };
            println!("    tools: {}{}", agent.tools.join(", "), scope);
        }
        if let Some(target) = &agent.reply_to {
            println!("    replies to: {}", target);
        }
    }
    println!();

    println!("{}", style("Triggers:").bold());
    if config.triggers.is_empty() {
        println!("  {}", style("none").dim());
    }
    for trigger in &config.triggers {
        match trigger {
            TriggerConfig::Timer {
                agent, interval_s, ..
            } => println!("  timer -> {} every {}s", agent, interval_s),
            TriggerConfig::FileWatch { agent, path, .. } => {
                println!("  file_watch -> {} on {}", agent, path)
            }
        }
    }

    Ok(())
}

fn run_validate(loader: &ConfigLoader) -> Result<()> {
    let path = loader.config_path();
    if !path.exists() {
        println!(
            "{} {} does not exist, built-in defaults apply",
            style("note:").yellow(),
            path.display()
        );
    }

    match loader.load() {
        Ok(config) => {
            println!(
                "{} {} agent(s), {} trigger(s)",
                style("Configuration is valid:").green().bold(),
                config.agents.len(),
                config.triggers.len()
            );
            Ok(())
        }
        Err(e) => {
            println!("{} {}", style("Configuration is invalid:").red().bold(), e);
            bail!("invalid configuration")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_relay_core::config::validate_config;
    use tempfile::TempDir;

    fn two_agents() -> Config {
        let mut config = starter_config();
        config.agents.push(AgentConfig {
            name: "writer".to_string(),
            instructions: "Write documents.".to_string(),
            ..Default::default()
        });
        config
    }

    #[test]
    fn test_starter_config_is_valid() {
        let config = starter_config();
        validate_config(&config).unwrap();
        assert_eq!(config.agents[0].name, "assistant");
    }

    #[test]
    fn test_resolve_target() {
        let single = starter_config();
        assert_eq!(resolve_target(&single, None).unwrap(), "assistant");

        let several = two_agents();
        assert_eq!(
            resolve_target(&several, Some("writer".to_string())).unwrap(),
            "writer"
        );
        assert!(resolve_target(&several, None)
            .unwrap_err()
            .to_string()
            .contains("--to"));
        assert!(resolve_target(&several, Some("ghost".to_string())).is_err());
        assert!(resolve_target(&Config::default(), None).is_err());
    }

    #[test]
    fn test_resolve_in() {
        let base = Path::new("/etc/agent-relay");
        assert_eq!(resolve_in(base, "logs"), base.join("logs"));
        assert_eq!(resolve_in(base, "/var/log/relay"), PathBuf::from("/var/log/relay"));
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(dir.path());
        let mut config = starter_config();
        config.defaults.workspace = dir.path().join("ws").to_string_lossy().into_owned();
        loader.save(&config).unwrap();

        let loaded = loader.load().unwrap();
        assert_eq!(loaded.agents.len(), 1);
        assert_eq!(loaded.agents[0].tools, vec!["read_file", "list_dir"]);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "agent-relay",
            "--config-dir",
            "/tmp/relay",
            "ask",
            "hello",
            "--to",
            "writer",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/relay")));
        match cli.command {
            Commands::Ask {
                message,
                to,
                timeout,
            } => {
                assert_eq!(message, "hello");
                assert_eq!(to.as_deref(), Some("writer"));
                assert_eq!(timeout, 300);
            }
            _ => panic!("expected ask"),
        }
    }
}
