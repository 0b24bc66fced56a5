//! Entity linking for biomedical questions
//!
//! Resolves mentions of genes, compounds, enzymes, reactions, pathways and
//! orthologs in free text to canonical identifiers.
//!
//! ## Architecture
//!
//! - `normalize` - text canonicalization shared by corpus and queries
//! - `corpus` - `ID_map_*.csv` alias tables
//! - `snapshot` - alias index: automaton + candidate table, bincode cache
//! - `exact` - automaton matching with greedy overlap resolution
//! - `patterns` - structured IDs and enzyme-name phrases
//! - `fuzzy` - token-set similarity against the vocabulary
//! - `ranking` - the single priority order used by every dedup stage
//! - `mention` - `EntityResolver`, which merges all sources
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bio_entity_linker::entity_linking::{AliasIndex, EntityResolver, ResolveOptions};
//!
//! # async fn example() -> bio_entity_linker::error::Result<()> {
//! let index = AliasIndex::load("cache/alias_index.bin".as_ref())?;
//! let resolver = EntityResolver::new(Arc::new(index));
//! let mentions = resolver
//!     .extract_mentions("Which pathways use alpha-linolenic acid?", &ResolveOptions::default())
//!     .await;
//! for m in &mentions {
//!     println!("{} -> {} ({})", m.text, m.id, m.database);
//! }
//! # Ok(())
//! # }
//! ```

pub mod corpus;
pub mod exact;
pub mod fuzzy;
pub mod mention;
pub mod normalize;
pub mod patterns;
pub mod ranking;
pub mod snapshot;
pub mod species;
pub mod types;

pub use fuzzy::{token_set_ratio, FuzzyMatcher};
pub use mention::{EntityResolver, EntityResolverBuilder, ResolveOptions};
pub use normalize::normalize;
pub use ranking::{DatabasePriority, HitRanker};
pub use snapshot::{AliasIndex, IndexRegistry, IndexStats};
pub use species::SpeciesHints;
pub use types::{AliasRecord, Database, Hit, HitSource, Mention};
