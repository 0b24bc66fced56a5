//! LLM Client Trait
//!
//! Unified interface for text-completion providers (Ollama, Gemini).

use anyhow::Result;
use async_trait::async_trait;

/// Sampling temperature used by every provider; span proposal should be
/// close to deterministic.
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Unified LLM client interface
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single prompt, return the raw text response
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
