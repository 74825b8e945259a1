//! Provider selection — builds the configured backend.

use crate::openai_compat::OpenAiCompatProvider;
use murmur_config::AppConfig;
use murmur_core::error::ProviderError;
use murmur_core::provider::Provider;
use std::sync::Arc;
use tracing::info;

/// Build the provider named by `config.model.provider`.
///
/// `local` runs the model in-process and needs the `local` feature. Every
/// other name is treated as an OpenAI-compatible completion server.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let model = &config.model;
    let provider_name = model.provider.trim().to_lowercase();

    if provider_name == "local" {
        return build_local(&model.name);
    }

    let base_url = model
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(&provider_name));

    info!(provider = %provider_name, model = %model.name, url = %base_url, "Using completion server");

    let provider = OpenAiCompatProvider::new(
        provider_name,
        base_url,
        model.name.clone(),
        model.api_key.clone(),
    )?;
    Ok(Arc::new(provider))
}

#[cfg(feature = "local")]
fn build_local(model_name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
    info!(model = %model_name, "Using in-process model");
    Ok(Arc::new(crate::local::LocalProvider::new(model_name)))
}

#[cfg(not(feature = "local"))]
fn build_local(_model_name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
    Err(ProviderError::NotConfigured(
        "this build has no in-process inference; rebuild with `--features local` \
         or set model.provider to a completion server such as \"ollama\""
            .into(),
    ))
}

/// Default base URL for well-known local completion servers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "ollama" => "http://localhost:11434/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "lmstudio" => "http://localhost:1234/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        _ => "http://localhost:8080/v1".into(),
    }
}
