//! Ollama Client
//!
//! LLM client implementation for a local Ollama server.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::llm_client::{LlmClient, DEFAULT_TEMPERATURE};

/// Default Ollama model
const DEFAULT_MODEL: &str = "llama3.1";

/// Default Ollama server address
const DEFAULT_HOST: &str = "http://localhost:11434";

/// Ollama `/api/generate` client
#[derive(Clone)]
pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
    model: String,
}

impl OllamaClient {
    /// Create a client for the server at `host`
    pub fn new(host: String) -> Self {
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::with_model(host, &model)
    }

    /// Create with a specific model
    pub fn with_model(host: String, model: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables (`OLLAMA_HOST`, `OLLAMA_MODEL`)
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Ok(Self::new(host))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Internal API call implementation
    async fn call_api(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({
                "model": &self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": DEFAULT_TEMPERATURE,
                    "top_p": 0.95,
                    "top_k": 40,
                    "num_ctx": 4096,
                    "num_predict": 2048
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Ollama API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct ApiResponse {
            response: String,
        }

        let api_response: ApiResponse = response.json().await?;
        Ok(api_response.response.trim().to_string())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.call_api(prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "Ollama"
    }
}
