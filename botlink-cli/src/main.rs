mod cli;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cli::handlers::{self, ListKind};

#[derive(Parser)]
#[command(name = "botlink")]
#[command(version)]
#[command(about = "Talk to a running chat-bot process from the command line")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    /// Path to configuration file (default: ~/.config/botlink/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Bot channel URL, overrides the configured one
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Bot application client id
    #[arg(long)]
    client_id: String,

    /// Bot token
    #[arg(long)]
    token: String,

    /// Workflow engine API key forwarded to the bot
    #[arg(long, default_value = "")]
    api_key: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Log the bot in and report its session state
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// List the text channels the bot can post to
    Channels {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List the server roles, without @everyone
    Roles {
        #[command(flatten)]
        credentials: CredentialArgs,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Send a raw request to the bot and print its answer
    ///
    /// Examples:
    ///   botlink request list:channels
    ///   botlink request send:message '{"channelId": "10", "content": "hi"}'
    Request {
        /// Message type
        kind: String,

        /// JSON payload (default: null)
        payload: Option<String>,
    },

    /// Post a trigger event to the workflow engine webhook
    Dispatch {
        /// Webhook identifier of the trigger
        webhook_id: String,

        /// Message content
        #[arg(long)]
        content: String,

        /// Channel the message was posted in
        #[arg(long)]
        channel_id: String,

        /// Author of the message
        #[arg(long)]
        user_id: String,

        /// Placeholder message id, if one was posted
        #[arg(long, default_value = "")]
        placeholder_id: String,

        /// Trigger record as JSON; a failed delivery deactivates it and notifies the bot
        #[arg(long)]
        trigger: Option<String>,

        /// Use the test webhook
        #[arg(long)]
        test: bool,
    },

    /// Show or initialise the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = handlers::resolve_config_path(cli.config.as_deref())?;
    let config = handlers::load_config(&config_path, cli.server.as_deref())?;
    let _ = botlink_core::services::logging::init_logging(config.log_level.clone());

    match cli.command {
        Commands::Login { credentials } => {
            handlers::handle_login(&config, credentials.into()).await?;
        }
        Commands::Channels { credentials, json } => {
            handlers::handle_list(&config, ListKind::Channels, credentials.into(), json).await?;
        }
        Commands::Roles { credentials, json } => {
            handlers::handle_list(&config, ListKind::Roles, credentials.into(), json).await?;
        }
        Commands::Request { kind, payload } => {
            handlers::handle_request(&config, &kind, payload.as_deref()).await?;
        }
        Commands::Dispatch {
            webhook_id,
            content,
            channel_id,
            user_id,
            placeholder_id,
            trigger,
            test,
        } => {
            let event = botlink_core::models::TriggerEvent {
                content,
                channel_id,
                user_id,
            };
            let delivered = handlers::handle_dispatch(
                &config,
                &webhook_id,
                event,
                &placeholder_id,
                trigger.as_deref(),
                test,
            )
            .await?;
            if !delivered {
                std::process::exit(1);
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => handlers::handle_config_show(&config, &config_path)?,
            ConfigCommands::Init { force } => handlers::handle_config_init(&config_path, force)?,
        },
    }

    Ok(())
}

impl From<CredentialArgs> for botlink_core::models::Credentials {
    fn from(args: CredentialArgs) -> Self {
        botlink_core::models::Credentials::new(args.client_id, args.token, args.api_key)
    }
}
