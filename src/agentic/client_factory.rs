//! LLM Client Factory
//!
//! Builds the configured provider behind `Arc<dyn LlmClient>`.

use std::sync::Arc;

use anyhow::Result;

use super::backend::LlmBackend;
use super::gemini_client::GeminiClient;
use super::llm_client::LlmClient;
use super::ollama_client::OllamaClient;
use crate::config::LlmSettings;

/// Create an LLM client based on the LLM_PROVIDER environment variable
pub fn create_llm_client() -> Result<Arc<dyn LlmClient>> {
    let backend = current_backend()?;
    tracing::debug!(%backend, "Creating LLM client from environment");
    match backend {
        LlmBackend::Ollama => Ok(Arc::new(OllamaClient::from_env()?)),
        LlmBackend::Gemini => Ok(Arc::new(GeminiClient::from_env()?)),
    }
}

/// Create an LLM client from explicit settings.
///
/// Unset fields fall back to the provider's environment variables and
/// defaults; the Gemini API key always comes from the environment.
pub fn create_llm_client_with_settings(settings: &LlmSettings) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match settings.provider {
        LlmBackend::Ollama => {
            let base = OllamaClient::from_env()?;
            let host = settings.host.clone().unwrap_or_else(|| base.host().to_string());
            let model = settings.model.as_deref().unwrap_or(base.model_name());
            Arc::new(OllamaClient::with_model(host, model))
        }
        LlmBackend::Gemini => {
            let base = GeminiClient::from_env()?;
            match settings.model.as_deref() {
                Some(model) => Arc::new(base.into_model(model)),
                None => Arc::new(base),
            }
        }
    };
    tracing::info!(
        provider = client.provider_name(),
        model = client.model_name(),
        "LLM client ready"
    );
    Ok(client)
}

/// Get the currently configured backend
pub fn current_backend() -> Result<LlmBackend> {
    Ok(LlmBackend::from_env()?)
}
