//! Mention resolution for questions
//!
//! `EntityResolver` runs every mention source over a question and merges the
//! results into one ordered list:
//!
//! 1. exact alias matches over the normalized question (automaton)
//! 2. structured IDs and enzyme phrases over the original question, mapped
//!    through the fuzzy matcher
//! 3. LLM-proposed spans reconciled against the vocabulary
//!
//! Merged hits are deduplicated twice through [`HitRanker`]: first the most
//! trusted hits per span (ties survive), then the best hit per entity.
//!
//! Exact-match offsets index the normalized question; every other source
//! indexes the original question. Callers substituting mentions back into
//! text must use `Mention::source` to pick the right string.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use super::exact;
use super::fuzzy::{FuzzyMatcher, ID_TOP_K, PHRASE_TOP_K};
use super::normalize::normalize;
use super::patterns::{enzyme_phrases, extract_ids, id_databases, id_spans, ENZYME_DATABASES};
use super::ranking::{DatabasePriority, HitRanker};
use super::snapshot::AliasIndex;
use super::species::SpeciesHints;
use super::types::{Hit, HitSource, Mention};
use crate::agentic::client_factory::create_llm_client_with_settings;
use crate::agentic::mention_proposer::{reconcile, LlmMentionProposer};
use crate::config::{LinkerConfig, DEFAULT_FUZZY_THRESHOLD};
use crate::entity_linking::corpus;
use crate::error::Result;

// =============================================================================
// Options
// =============================================================================

/// Per-call resolution options.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    /// Restrict candidates to this species; inferred from the question when unset
    pub species_hint: Option<String>,
    pub use_regex: bool,
    pub use_llm: bool,
    /// Minimum similarity (0-100) for approximate matches
    pub fuzzy_threshold: f64,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            species_hint: None,
            use_regex: true,
            use_llm: true,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl From<&LinkerConfig> for ResolveOptions {
    fn from(config: &LinkerConfig) -> Self {
        Self {
            use_llm: config.llm.enabled,
            fuzzy_threshold: config.fuzzy_threshold,
            ..Self::default()
        }
    }
}

impl ResolveOptions {
    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species_hint = Some(species.into());
        self
    }

    /// Exact and regex sources only.
    pub fn without_llm(mut self) -> Self {
        self.use_llm = false;
        self
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves questions to entity mentions.
///
/// Cheap to clone; the alias index and LLM client are shared.
#[derive(Debug, Clone, Default)]
pub struct EntityResolver {
    index: Option<Arc<AliasIndex>>,
    proposer: Option<LlmMentionProposer>,
    ranker: HitRanker,
    species_hints: SpeciesHints,
}

/// Builder for [`EntityResolver`]
#[derive(Debug, Default)]
pub struct EntityResolverBuilder {
    index: Option<Arc<AliasIndex>>,
    proposer: Option<LlmMentionProposer>,
    databases: DatabasePriority,
    species_hints: SpeciesHints,
}

impl EntityResolverBuilder {
    pub fn index(mut self, index: Arc<AliasIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn proposer(mut self, proposer: LlmMentionProposer) -> Self {
        self.proposer = Some(proposer);
        self
    }

    pub fn database_priority(mut self, databases: DatabasePriority) -> Self {
        self.databases = databases;
        self
    }

    pub fn species_hints(mut self, hints: SpeciesHints) -> Self {
        self.species_hints = hints;
        self
    }

    pub fn build(self) -> EntityResolver {
        EntityResolver {
            index: self.index,
            proposer: self.proposer,
            ranker: HitRanker::new(self.databases),
            species_hints: self.species_hints,
        }
    }
}

impl EntityResolver {
    pub fn builder() -> EntityResolverBuilder {
        EntityResolverBuilder::default()
    }

    /// Resolver over `index` with default ranking and no LLM source.
    pub fn new(index: Arc<AliasIndex>) -> Self {
        Self::builder().index(index).build()
    }

    /// Assemble a resolver from configuration: load (or rebuild) the alias
    /// index and, when enabled, connect the LLM provider.
    ///
    /// Index failures propagate. An LLM provider that cannot be configured
    /// only disables the LLM source.
    pub fn from_config(config: &LinkerConfig) -> Result<Self> {
        let index = corpus::load_or_build(&config.cache_path, &config.corpus_dir, config.min_alias_length)?;

        let mut builder = Self::builder()
            .index(Arc::new(index))
            .database_priority(config.database_priority.clone())
            .species_hints(config.species_hints.clone());

        if config.llm.enabled {
            match create_llm_client_with_settings(&config.llm) {
                Ok(client) => {
                    builder = builder.proposer(LlmMentionProposer::new(client).with_timeout(config.llm.timeout()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "LLM provider unavailable, continuing without LLM mentions");
                }
            }
        }
        Ok(builder.build())
    }

    pub fn index(&self) -> Option<&Arc<AliasIndex>> {
        self.index.as_ref()
    }

    pub fn ranker(&self) -> &HitRanker {
        &self.ranker
    }

    pub fn has_proposer(&self) -> bool {
        self.proposer.is_some()
    }

    /// Species code implied by the (normalized) question, if any.
    pub fn guess_species_hint(&self, normalized: &str) -> Option<&str> {
        self.species_hints.guess(normalized)
    }

    /// Resolve all entity mentions in `question`.
    ///
    /// Never fails: a source that cannot run (no index, LLM outage)
    /// contributes nothing and the others still populate the result.
    pub async fn extract_mentions(&self, question: &str, options: &ResolveOptions) -> Vec<Mention> {
        let normalized = normalize(question);
        let species_hint = options
            .species_hint
            .as_deref()
            .or_else(|| self.guess_species_hint(&normalized));

        let mut hits = Vec::new();

        match self.index.as_deref() {
            Some(index) => hits.extend(exact::search(&normalized, index, species_hint, &self.ranker)),
            None => tracing::warn!("No alias index loaded, skipping exact matching"),
        }

        if options.use_regex {
            hits.extend(self.pattern_hits(question, species_hint, options.fuzzy_threshold));
        }

        if options.use_llm {
            hits.extend(self.llm_hits(question, species_hint, options.fuzzy_threshold).await);
        }

        let merged = hits.len();
        hits.retain(|hit| valid_position(hit, question, &normalized));
        if hits.len() < merged {
            tracing::debug!(dropped = merged - hits.len(), "Dropped hits with invalid positions");
        }

        let by_span = self.ranker.dedup_by_span(hits);
        let span_count = by_span.len();
        let by_entity = self.ranker.dedup_by_entity(by_span);

        tracing::debug!(
            merged,
            spans = span_count,
            mentions = by_entity.len(),
            species = species_hint.unwrap_or("-"),
            "Resolved question"
        );
        by_entity.into_iter().map(Mention::from).collect()
    }

    /// Resolve many questions, at most `concurrency` at a time. Output order
    /// matches input order.
    pub async fn resolve_batch<S>(
        &self,
        questions: &[S],
        options: &ResolveOptions,
        concurrency: usize,
    ) -> Vec<Vec<Mention>>
    where
        S: AsRef<str>,
    {
        stream::iter(questions.iter().map(|q| self.extract_mentions(q.as_ref(), options)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Structured IDs as direct hits, plus IDs and enzyme phrases mapped
    /// through the vocabulary.
    fn pattern_hits(&self, question: &str, species_hint: Option<&str>, threshold: f64) -> Vec<Hit> {
        let mut hits = extract_ids(question);

        let Some(index) = self.index.as_deref() else {
            return hits;
        };
        let matcher = FuzzyMatcher::new(index).with_species_hint(species_hint);

        for phrase in enzyme_phrases(question) {
            hits.extend(matcher.match_span(
                &phrase.text,
                (phrase.start, phrase.end),
                PHRASE_TOP_K,
                threshold,
                Some(ENZYME_DATABASES),
            ));
        }
        for span in id_spans(question) {
            hits.extend(matcher.match_span(
                &span.text,
                (span.start, span.end),
                ID_TOP_K,
                threshold,
                Some(id_databases(&span.text)),
            ));
        }

        tracing::debug!(hits = hits.len(), "Pattern matches");
        hits
    }

    async fn llm_hits(&self, question: &str, species_hint: Option<&str>, threshold: f64) -> Vec<Hit> {
        let (Some(proposer), Some(index)) = (self.proposer.as_ref(), self.index.as_deref()) else {
            return Vec::new();
        };
        let proposed = proposer.propose(question).await;
        reconcile(question, &proposed, index, species_hint, threshold)
    }
}

/// A hit is usable only if its span is a non-empty slice of the text its
/// source scanned.
fn valid_position(hit: &Hit, question: &str, normalized: &str) -> bool {
    let text = match hit.source {
        HitSource::Ac => normalized,
        _ => question,
    };
    hit.start < hit.end
        && hit.end <= text.len()
        && text.is_char_boundary(hit.start)
        && text.is_char_boundary(hit.end)
}
