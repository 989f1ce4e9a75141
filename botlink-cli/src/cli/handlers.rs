//! CLI command handlers

use anyhow::{Context, Result};
use botlink_core::models::{Configuration, Credentials, DropdownOption, Trigger, TriggerEvent};
use botlink_core::{BotResolvers, ChannelClient, ProcessState, SessionNegotiator, TriggerDispatcher};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// How long a failed dispatch waits for the deactivation notice to reach the bot
const NOTICE_FLUSH_TIMEOUT: Duration = Duration::from_secs(3);

/// Which dropdown list to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Channels,
    Roles,
}

/// Expand `~/` and fall back to the XDG location when no path is given.
pub fn resolve_config_path(config_file: Option<&str>) -> Result<PathBuf> {
    match config_file {
        None => Configuration::default_config_path()
            .map_err(|e| anyhow::anyhow!("Failed to get default config path: {}", e)),
        Some(path) if path.starts_with("~/") => {
            let home = std::env::var("HOME")
                .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
            Ok(PathBuf::from(path.replacen("~/", &format!("{}/", home), 1)))
        }
        Some(path) => Ok(PathBuf::from(path)),
    }
}

/// Load the config file (defaults when absent) and apply the `--server` override.
pub fn load_config(path: &Path, server: Option<&str>) -> Result<Configuration> {
    let mut config = Configuration::load_from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(server) = server {
        config.channel_url = server.to_string();
    }

    if let Err(errors) = config.validate() {
        anyhow::bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }

    Ok(config)
}

fn build_channel(config: &Configuration) -> Result<Arc<ChannelClient>> {
    let client = ChannelClient::from_config(config)
        .with_context(|| format!("Invalid channel URL: {}", config.channel_url))?;
    Ok(Arc::new(client))
}

fn build_resolvers(config: &Configuration, client: &Arc<ChannelClient>) -> BotResolvers {
    let negotiator =
        SessionNegotiator::new(client.clone()).with_timeout(config.credentials_timeout());
    BotResolvers::new(client.clone())
        .with_negotiator(negotiator)
        .with_list_timeout(config.list_timeout())
}

/// Handle the 'login' command
pub async fn handle_login(config: &Configuration, credentials: Credentials) -> Result<()> {
    let client = build_channel(config)?;
    let result = build_resolvers(config, &client)
        .negotiator()
        .negotiate(&credentials)
        .await;
    client.shutdown();

    let outcome = result.context("Login failed")?;
    println!("Bot session: {}", outcome);
    Ok(())
}

/// Handle the 'channels' and 'roles' commands
pub async fn handle_list(
    config: &Configuration,
    kind: ListKind,
    credentials: Credentials,
    json: bool,
) -> Result<()> {
    let client = build_channel(config)?;
    let resolvers = build_resolvers(config, &client);
    let options = match kind {
        ListKind::Channels => resolvers.get_channels(&credentials).await,
        ListKind::Roles => resolvers.get_roles(&credentials).await,
    };
    client.shutdown();

    println!("{}", render_options(&options, json)?);
    Ok(())
}

/// Handle the 'request' command
pub async fn handle_request(config: &Configuration, kind: &str, payload: Option<&str>) -> Result<()> {
    let payload = parse_payload(payload)?;
    let client = build_channel(config)?;

    tracing::debug!(kind = kind, "Sending raw request");
    let result = build_resolvers(config, &client)
        .ipc_request(kind, payload)
        .await;
    client.shutdown();

    let response = result.with_context(|| format!("Request '{}' failed", kind))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Handle the 'dispatch' command. Returns whether the engine accepted the event.
///
/// With a `trigger` record a failed delivery deactivates it and sends the
/// updated record to the bot. Without one the failure is only reported.
pub async fn handle_dispatch(
    config: &Configuration,
    webhook_id: &str,
    event: TriggerEvent,
    placeholder_id: &str,
    trigger: Option<&str>,
    test: bool,
) -> Result<bool> {
    let trigger = parse_trigger(trigger, webhook_id)?;
    let client = build_channel(config)?;
    let state = Arc::new(ProcessState::new(
        config.webhook_host.clone(),
        test || config.test_mode,
    ));
    if let Some(trigger) = trigger {
        state.register_trigger(trigger).await;
    }

    let dispatcher = TriggerDispatcher::new(state.clone(), client.clone());
    let url = dispatcher.webhook_url(webhook_id);
    let delivered = dispatcher.dispatch(webhook_id, &event, placeholder_id).await;
    if !delivered {
        if let Err(e) = client.flush(NOTICE_FLUSH_TIMEOUT).await {
            tracing::warn!(webhook_id = webhook_id, error = %e, "Deactivation notice may not have reached the bot");
        }
    }
    client.shutdown();

    if delivered {
        println!("Delivered to {}", url);
    } else {
        eprintln!("Delivery to {} failed", url);
        for line in state.logs().await {
            eprintln!("  {}", line);
        }
    }
    Ok(delivered)
}

/// Handle the 'config show' command
pub fn handle_config_show(config: &Configuration, path: &Path) -> Result<()> {
    println!("# {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to render configuration")?
    );
    Ok(())
}

/// Handle the 'config init' command
pub fn handle_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file {} already exists, use --force to overwrite",
            path.display()
        );
    }

    Configuration::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn parse_trigger(raw: Option<&str>, webhook_id: &str) -> Result<Option<Trigger>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trigger: Trigger = serde_json::from_str(raw).context("Trigger is not a valid record")?;
    if trigger.webhook_id != webhook_id {
        anyhow::bail!(
            "Trigger record is for webhook '{}', not '{}'",
            trigger.webhook_id,
            webhook_id
        );
    }
    Ok(Some(trigger))
}

fn parse_payload(payload: Option<&str>) -> Result<Value> {
    match payload {
        None => Ok(Value::Null),
        Some(raw) => serde_json::from_str(raw).context("Payload is not valid JSON"),
    }
}

fn render_options(options: &[DropdownOption], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(options)?);
    }
    Ok(options
        .iter()
        .map(|option| format!("{}\t{}", option.name, option.value))
        .collect::<Vec<_>>()
        .join("\n"))
}
