pub mod chat;
pub mod history;
pub mod init;
pub mod serve;

use murmur_agent::ConversationEngine;
use murmur_config::AppConfig;
use std::sync::Arc;
use tracing::warn;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Build the provider and the engine around it.
///
/// An unreachable model server is only a warning: it may come up later.
pub async fn build_engine(
    config: &AppConfig,
) -> Result<Arc<ConversationEngine>, Box<dyn std::error::Error>> {
    let provider = murmur_providers::build_from_config(config)
        .map_err(|e| format!("Cannot set up model '{}': {e}", config.model.name))?;

    match provider.health_check().await {
        Ok(true) => {}
        Ok(false) => warn!(provider = provider.name(), "Model server answered but is not ready"),
        Err(e) => warn!(provider = provider.name(), error = %e, "Model server is not reachable yet"),
    }

    let engine = ConversationEngine::from_config(config, provider)?;
    Ok(Arc::new(engine))
}
