use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, ShoplyError};

/// Top-level configuration for the Shoply support bot.
///
/// Loaded from `shoply.toml` by default. Each section corresponds to one
/// collaborator or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShoplyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ShoplyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShoplyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load the config file, falling back to defaults.
    ///
    /// A missing file is not an error. An unreadable or malformed file
    /// yields defaults together with the error, so the caller can report it
    /// once logging is configured.
    pub fn load_or_default(path: &Path) -> (Self, Option<ShoplyError>) {
        if !path.exists() {
            return (Self::default(), None);
        }
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(ShoplyError::Config("llm.model must not be empty".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ShoplyError::Config(
                "llm.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.chat.order_command.trim().is_empty() {
            return Err(ShoplyError::Config(
                "chat.order_command must not be empty".into(),
            ));
        }
        if self.chat.exit_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ShoplyError::Config(
                "chat.exit_keywords must contain at least one keyword".into(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding `faq.json` and `orders.json`.
    pub data_dir: String,
    /// Diagnostic log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Session identifier used when none is given on the command line.
    pub session_id: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            log_level: "warn".to_string(),
            session_id: "01".to_string(),
        }
    }
}

/// Chat-completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier sent with every request.
    pub model: String,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,
    /// API key. Usually supplied through `OPENAI_API_KEY` instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Verify the server's TLS certificate.
    pub verify_tls: bool,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            verify_tls: true,
            timeout_secs: 60,
            temperature: 0.0,
        }
    }
}

/// Interaction log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write one JSONL record per turn.
    pub enabled: bool,
    /// Directory receiving `session_<id>.jsonl` files.
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "logs".to_string(),
        }
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Store name used in the system prompt and greeting.
    pub store_name: String,
    /// Language the assistant is told to answer in.
    pub reply_language: String,
    /// Prefix that routes a turn to the order lookup.
    pub order_command: String,
    /// Case-insensitive inputs that end the session.
    pub exit_keywords: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            store_name: "Shoply".to_string(),
            reply_language: "English".to_string(),
            order_command: "/order".to_string(),
            exit_keywords: vec![
                "stop".to_string(),
                "exit".to_string(),
                "стоп".to_string(),
                "выход".to_string(),
            ],
        }
    }
}
