use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod config;
mod db;
mod llm;
mod pipeline;
mod prompt;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Configuration comes first so the log level can come from it
    let config = AppConfig::new(&args).map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config.logging);

    info!(
        "Initializing LLM manager with backend: {} ({})",
        config.llm.backend, config.llm.model
    );
    let llm_manager = match LlmManager::new(&config.llm) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Failed to initialize LLM manager: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Fallback database: {}, uploads go to {}, statement policy: {:?}",
        config.database.fallback_path, config.database.upload_dir, config.database.statement_policy
    );

    let web_config = config.web.clone();
    let app_state = Arc::new(AppState::new(config, llm_manager));

    info!("Starting QueryCraft server on {}:{}", web_config.host, web_config.port);
    match web::run_server(web_config, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
