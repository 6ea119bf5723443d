//! Shoply application binary - composition root.
//!
//! 1. Load `.env`, CLI flags and the TOML configuration
//! 2. Load FAQ and order reference data
//! 3. Build the LLM client, session store and interaction logger
//! 4. Run the console session loop until exit, EOF or Ctrl-C

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shoply_chat::{
    InteractionLogger, OpenAiClient, SessionLoop, SessionStore, SupportOrchestrator,
};
use shoply_core::{ReferenceData, ShoplyConfig, ShoplyError};

use cli::CliArgs;

/// RUST_LOG wins; otherwise the resolved `general.log_level`.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is normal.
    let _ = dotenv::dotenv();

    let args = CliArgs::parse();
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = ShoplyConfig::load_or_default(&config_file);
    args.apply_overrides(&mut config);

    init_tracing(&config.general.log_level);
    tracing::info!("Starting Shoply v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
        None => tracing::info!(path = %config_file.display(), "Configuration resolved"),
    }

    config.validate()?;

    let Some(api_key) = CliArgs::resolve_api_key(&config) else {
        tracing::error!("No API key configured");
        return Err(ShoplyError::Config(
            "OPENAI_API_KEY is not set (environment, .env or llm.api_key)".into(),
        )
        .into());
    };

    // Reference data.
    let data_dir = PathBuf::from(&config.general.data_dir);
    let data = match ReferenceData::load(&data_dir) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(
                path = %data_dir.display(),
                error = %e,
                "Failed to load reference data"
            );
            return Err(e.into());
        }
    };

    // Collaborators.
    let llm = Arc::new(OpenAiClient::new(&config.llm, api_key)?);
    tracing::info!(model = %llm.model(), endpoint = %llm.endpoint(), "LLM client ready");

    let logger = if config.logging.enabled {
        let logger = InteractionLogger::new(&config.logging.dir);
        tracing::info!(dir = %logger.dir().display(), "Interaction logging enabled");
        Some(logger)
    } else {
        tracing::info!("Interaction logging disabled");
        None
    };

    let sessions = Arc::new(SessionStore::new());
    let orchestrator = Arc::new(SupportOrchestrator::new(
        &config.chat,
        data,
        Arc::clone(&sessions),
        llm,
        logger,
    ));

    // === Session loop ===

    let session = SessionLoop::new(orchestrator, config.general.session_id.clone(), &config.chat);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let exit = session.run(stdin, &mut stdout, shutdown).await?;
    tracing::info!(
        reason = ?exit,
        sessions = sessions.len(),
        "Shoply stopped"
    );
    Ok(())
}
