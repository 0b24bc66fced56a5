//! Linker configuration
//!
//! Loaded from YAML, then overridden from the environment (`.env` is read
//! first via dotenvy). Every field has a default, so an empty file or no
//! file at all yields a working configuration.
//!
//! Environment overrides:
//! - `LINKER_CONFIG` - YAML file to start from
//! - `LINKER_CACHE_PATH`, `LINKER_CORPUS_DIR`
//! - `LINKER_MIN_ALIAS_LEN`, `LINKER_FUZZY_THRESHOLD`, `LINKER_BATCH_CONCURRENCY`
//! - `LINKER_LLM_ENABLED`, `LINKER_LLM_TIMEOUT_SECS`, `LINKER_LLM_MODEL`
//! - `LLM_PROVIDER`, `OLLAMA_HOST`

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agentic::backend::LlmBackend;
use crate::entity_linking::ranking::DatabasePriority;
use crate::entity_linking::snapshot::DEFAULT_MIN_ALIAS_LEN;
use crate::entity_linking::species::SpeciesHints;
use crate::error::{LinkerError, Result};

/// Fuzzy threshold the resolver applies to regex and LLM spans
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 95.0;

/// Questions resolved concurrently by `resolve_batch`
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// LLM call budget
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

/// LLM provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub enabled: bool,
    pub provider: LlmBackend,
    /// Provider default when unset
    pub model: Option<String>,
    /// Ollama server address; ignored by hosted providers
    pub host: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: LlmBackend::default(),
            model: None,
            host: None,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Bincode alias index artifact
    pub cache_path: PathBuf,
    /// Directory of `ID_map_*.csv` alias tables
    pub corpus_dir: PathBuf,
    pub min_alias_length: usize,
    pub fuzzy_threshold: f64,
    pub batch_concurrency: usize,
    pub species_hints: SpeciesHints,
    pub database_priority: DatabasePriority,
    pub llm: LlmSettings,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("cache/alias_index.bin"),
            corpus_dir: PathBuf::from("data/id_maps"),
            min_alias_length: DEFAULT_MIN_ALIAS_LEN,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            species_hints: SpeciesHints::default(),
            database_priority: DatabasePriority::default(),
            llm: LlmSettings::default(),
        }
    }
}

impl LinkerConfig {
    /// Load from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LinkerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    /// Load from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| LinkerError::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Build from the environment: `.env`, then `LINKER_CONFIG`, then
    /// individual overrides.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match std::env::var("LINKER_CONFIG") {
            Ok(path) => Self::from_yaml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LINKER_CACHE_PATH") {
            self.cache_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LINKER_CORPUS_DIR") {
            self.corpus_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LINKER_MIN_ALIAS_LEN") {
            self.min_alias_length = parse_var("LINKER_MIN_ALIAS_LEN", &v)?;
        }
        if let Some(v) = lookup("LINKER_FUZZY_THRESHOLD") {
            self.fuzzy_threshold = parse_var("LINKER_FUZZY_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("LINKER_BATCH_CONCURRENCY") {
            self.batch_concurrency = parse_var("LINKER_BATCH_CONCURRENCY", &v)?;
        }
        if let Some(v) = lookup("LINKER_LLM_ENABLED") {
            self.llm.enabled = parse_var("LINKER_LLM_ENABLED", &v)?;
        }
        if let Some(v) = lookup("LINKER_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_var("LINKER_LLM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("LINKER_LLM_MODEL") {
            self.llm.model = Some(v);
        }
        if let Some(v) = lookup("LLM_PROVIDER") {
            self.llm.provider = v.parse()?;
        }
        if let Some(v) = lookup("OLLAMA_HOST") {
            self.llm.host = Some(v);
        }
        Ok(())
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(LinkerError::Config(format!(
                "fuzzy_threshold must be within 0..=100, got {}",
                self.fuzzy_threshold
            )));
        }
        if self.min_alias_length == 0 {
            return Err(LinkerError::Config("min_alias_length must be at least 1".to_string()));
        }
        if self.batch_concurrency == 0 {
            return Err(LinkerError::Config("batch_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| LinkerError::Config(format!("{}='{}': {}", key, value, e)))
}
