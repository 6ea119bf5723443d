//! CLI argument definitions for the Shoply support bot.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use shoply_core::ShoplyConfig;

/// Default config file, looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "shoply.toml";

/// Shoply: console customer-support bot with order lookup and FAQ-grounded answers.
#[derive(Parser, Debug, Default)]
#[command(name = "shoply", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Session identifier used for history and the log file name.
    #[arg(short = 's', long = "session")]
    pub session: Option<String>,

    /// Directory holding faq.json and orders.json.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Directory for session_<id>.jsonl interaction logs.
    #[arg(long = "logs-dir")]
    pub logs_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Do not write interaction logs.
    #[arg(long = "no-log")]
    pub no_log: bool,

    /// Chat model name.
    #[arg(long = "model")]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Skip TLS certificate verification for the LLM endpoint.
    #[arg(long = "insecure")]
    pub insecure: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SHOPLY_CONFIG env var > ./shoply.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(env_var)
    }

    fn resolve_config_path_with(&self, env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env("SHOPLY_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Apply flag and environment overrides on top of the loaded file.
    pub fn apply_overrides(&self, config: &mut ShoplyConfig) {
        self.apply_overrides_with(config, env_var);
    }

    fn apply_overrides_with(
        &self,
        config: &mut ShoplyConfig,
        env: impl Fn(&str) -> Option<String>,
    ) {
        if let Some(ref session) = self.session {
            config.general.session_id = session.clone();
        }
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref dir) = self.logs_dir {
            config.logging.dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if self.no_log {
            config.logging.enabled = false;
        }

        if let Some(model) = self.model.clone().or_else(|| env("OPENAI_MODEL")) {
            config.llm.model = model;
        }
        if let Some(url) = self
            .base_url
            .clone()
            .or_else(|| env("OPENAI_API_BASE"))
            .or_else(|| env("BASE_URL"))
        {
            config.llm.base_url = url;
        }
        if self.insecure {
            config.llm.verify_tls = false;
        }
    }

    /// Resolve the API key.
    ///
    /// Priority: OPENAI_API_KEY env var > `llm.api_key` in the config file.
    pub fn resolve_api_key(config: &ShoplyConfig) -> Option<String> {
        resolve_api_key_with(config, env_var)
    }
}

fn resolve_api_key_with(
    config: &ShoplyConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env("OPENAI_API_KEY")
        .or_else(|| config.llm.api_key.clone())
        .filter(|k| !k.trim().is_empty())
}

/// Non-empty environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
