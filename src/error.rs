//! Error handling for the entity linker
//!
//! Only build-time and cache-load failures propagate to callers. Per-source
//! extraction failures (LLM outages, malformed responses) are absorbed inside
//! the source that produced them and surface as an empty hit list.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for index construction, persistence and configuration
#[derive(Error, Debug)]
pub enum LinkerError {
    #[error("Alias source unavailable at {}: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Alias cache at {} is corrupt: {reason}", path.display())]
    CacheCorrupt { path: PathBuf, reason: String },

    #[error("Failed to write alias cache to {}: {source}", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Automaton construction failed: {0}")]
    Automaton(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<aho_corasick::BuildError> for LinkerError {
    fn from(error: aho_corasick::BuildError) -> Self {
        LinkerError::Automaton(error.to_string())
    }
}

/// Failures of the LLM mention source.
///
/// These never leave the extractor: they are logged and downgraded to
/// "no mentions from this source".
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM unavailable: {0}")]
    Unavailable(String),

    #[error("LLM returned a malformed response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, LinkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_path() {
        let err = LinkerError::CacheCorrupt {
            path: PathBuf::from("/tmp/aliases.bin"),
            reason: "version mismatch".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Alias cache at /tmp/aliases.bin is corrupt: version mismatch"
        );

        let err = LinkerError::SourceUnavailable {
            path: PathBuf::from("maps"),
            reason: "no ID_map_*.csv files".to_string(),
        };
        assert!(err.to_string().contains("maps"));
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::MalformedResponse("missing key 'mentions'".to_string());
        assert!(err.to_string().contains("malformed"));
    }
}
