//! Bio Entity Linker
//!
//! Maps free-text biomedical questions to canonical graph-entity identifiers
//! (genes, compounds, enzymes, reactions, pathways, orthologs, modules) so a
//! downstream query builder can substitute them into templates.
//!
//! ## Sources
//! - Aho-Corasick automaton over normalized aliases (exact)
//! - Regexes for KEGG-style codes, EC numbers and enzyme names
//! - Token-set fuzzy matching against the alias vocabulary
//! - LLM-proposed spans, reconciled against the vocabulary
//!
//! All sources are merged by one ranking and deduplicated per span and per
//! entity. See [`entity_linking::EntityResolver`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bio_entity_linker::config::LinkerConfig;
//! use bio_entity_linker::entity_linking::{EntityResolver, ResolveOptions};
//!
//! # async fn example() -> bio_entity_linker::error::Result<()> {
//! let config = LinkerConfig::from_env()?;
//! let resolver = EntityResolver::from_config(&config)?;
//! let mentions = resolver
//!     .extract_mentions("What enzymes does gene eco:b0001 encode?", &ResolveOptions::from(&config))
//!     .await;
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Configuration (YAML + environment)
pub mod config;

// Mention sources and resolution
pub mod entity_linking;

// LLM providers and span proposal
pub mod agentic;

// Logging setup
pub mod telemetry;

pub use entity_linking::{EntityResolver, Mention, ResolveOptions};
pub use error::{LinkerError, LlmError, Result};
