//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use antibot_platform::{TelegramConfig, DEFAULT_API_URL};
use antibot_types::ChatId;
use antibot_verification::{GateConfig, RemovalMode};

use crate::{LogFormat, NodeError};

/// Configuration for an antibot node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// JSON document holding the chat registry.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Bot API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bot API token. Supplied on the command line or through the
    /// environment, never read from or written to the config file.
    #[serde(skip)]
    pub bot_token: String,

    /// Server-side long-poll timeout for `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Time a new member has to press "Verify", in seconds.
    #[serde(default = "default_expiry_window_secs")]
    pub expiry_window_secs: u64,

    /// Chats to protect. Empty means every chat the bot administers.
    #[serde(default)]
    pub allowed_chats: Vec<ChatId>,

    /// What happens to users who do not verify: "ban" or "kick".
    #[serde(default)]
    pub removal_mode: RemovalMode,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_state_file() -> PathBuf {
    PathBuf::from("./antibot_data/chats.json")
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_expiry_window_secs() -> u64 {
    60
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            NodeError::Config(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string. The token is omitted.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.bot_token.trim().is_empty() {
            return Err(NodeError::Config("bot token is not set".into()));
        }
        if self.expiry_window_secs == 0 {
            return Err(NodeError::Config(
                "expiry_window_secs must be at least 1".into(),
            ));
        }
        self.log_format
            .parse::<LogFormat>()
            .map_err(NodeError::Config)?;
        Ok(())
    }

    /// The configured log format, falling back to human-readable output.
    pub fn format(&self) -> LogFormat {
        self.log_format.parse().unwrap_or(LogFormat::Human)
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            expiry_window: Duration::from_secs(self.expiry_window_secs),
            allowed_chats: self.allowed_chats.clone(),
            removal: self.removal_mode,
        }
    }

    pub fn telegram_config(&self) -> TelegramConfig {
        TelegramConfig {
            api_url: self.api_url.clone(),
            token: self.bot_token.clone(),
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            api_url: default_api_url(),
            bot_token: String::new(),
            poll_timeout_secs: default_poll_timeout_secs(),
            expiry_window_secs: default_expiry_window_secs(),
            allowed_chats: Vec::new(),
            removal_mode: RemovalMode::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
