//! Antibot daemon: entry point for running the join-verification bot.

use antibot_node::{init_logging, AntibotNode, NodeConfig};
use antibot_types::ChatId;
use antibot_verification::RemovalMode;
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "antibot-daemon", about = "Telegram anti-bot join verification daemon")]
struct Cli {
    /// Bot API token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Registry file (JSON).
    #[arg(long, env = "ANTIBOT_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Bot API base URL.
    #[arg(long, env = "ANTIBOT_API_URL")]
    api_url: Option<String>,

    /// Seconds a new member has to press "Verify".
    #[arg(long, env = "ANTIBOT_EXPIRY_WINDOW")]
    expiry_window: Option<u64>,

    /// Long-poll timeout for getUpdates, in seconds.
    #[arg(long, env = "ANTIBOT_POLL_TIMEOUT")]
    poll_timeout: Option<u64>,

    /// Chats to protect (comma-separated ids). Default: every chat the bot administers.
    #[arg(long, env = "ANTIBOT_ALLOWED_CHATS", value_delimiter = ',', allow_hyphen_values = true)]
    allowed_chats: Vec<i64>,

    /// Remove unverified users with a permanent ban instead of a kick.
    #[arg(long, conflicts_with = "kick")]
    ban: bool,

    /// Remove unverified users with a kick (ban then unban) so they may rejoin.
    #[arg(long)]
    kick: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "ANTIBOT_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ANTIBOT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the bot until SIGINT/SIGTERM.
    Run,
    /// Print the effective configuration as TOML (without the token) and exit.
    PrintConfig,
}

impl Cli {
    /// Overlay command-line flags and environment on top of `base`.
    fn merge_into(self, base: NodeConfig) -> NodeConfig {
        let removal_mode = if self.kick {
            RemovalMode::Kick
        } else if self.ban {
            RemovalMode::Ban
        } else {
            base.removal_mode
        };
        NodeConfig {
            state_file: self.state_file.unwrap_or(base.state_file),
            api_url: self.api_url.unwrap_or(base.api_url),
            bot_token: self.token.unwrap_or(base.bot_token),
            poll_timeout_secs: self.poll_timeout.unwrap_or(base.poll_timeout_secs),
            expiry_window_secs: self.expiry_window.unwrap_or(base.expiry_window_secs),
            allowed_chats: if self.allowed_chats.is_empty() {
                base.allowed_chats
            } else {
                self.allowed_chats.into_iter().map(ChatId::new).collect()
            },
            removal_mode,
            log_format: self.log_format.unwrap_or(base.log_format),
            log_level: self.log_level.unwrap_or(base.log_level),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut cli = Cli::parse();

    let base = match cli.config.take() {
        Some(path) => NodeConfig::from_toml_file(&path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => NodeConfig::default(),
    };
    let command = std::mem::replace(&mut cli.command, Command::Run);
    let config = cli.merge_into(base);

    if let Command::PrintConfig = command {
        print!("{}", config.to_toml_string());
        return Ok(());
    }

    config.validate().context("invalid configuration")?;
    init_logging(config.format(), &config.log_level);

    tracing::info!(
        state_file = %config.state_file.display(),
        window_secs = config.expiry_window_secs,
        chats = config.allowed_chats.len(),
        "starting antibot"
    );

    let mut node = AntibotNode::new(config).await?;
    node.start().await?;

    tracing::info!("shutdown signal received, stopping node");
    node.stop().await?;

    tracing::info!("antibot daemon exited cleanly");
    Ok(())
}
