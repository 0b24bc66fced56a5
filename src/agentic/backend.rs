//! Backend Selection
//!
//! Enum for selecting between LLM providers (Ollama, Gemini).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LinkerError;

/// LLM backend provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama server (default)
    #[default]
    Ollama,
    /// Google Gemini
    Gemini,
}

impl LlmBackend {
    /// Create from LLM_PROVIDER environment variable
    ///
    /// Valid values: "ollama", "gemini", "google"
    /// Defaults to Ollama if not set
    pub fn from_env() -> Result<Self, LinkerError> {
        let value = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string());
        value.parse()
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            LlmBackend::Ollama => "Ollama",
            LlmBackend::Gemini => "Gemini",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = LinkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(LlmBackend::Ollama),
            "gemini" | "google" => Ok(LlmBackend::Gemini),
            other => Err(LinkerError::Config(format!(
                "Unknown LLM_PROVIDER '{}'. Valid values: ollama, gemini, google",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
