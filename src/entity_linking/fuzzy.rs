//! Approximate span-to-alias matching
//!
//! Spans the automaton cannot see (regex captures, LLM proposals) are mapped
//! onto the alias vocabulary by token-set similarity. Scores are on a 0-100
//! scale and follow the usual token-set ratio definition: identical token
//! sets, or one set contained in the other, score 100.

use std::collections::BTreeSet;

use rapidfuzz::distance::indel;

use super::normalize::normalize;
use super::snapshot::AliasIndex;
use super::types::{species_allowed, AliasRecord, Database, Hit, HitSource};

/// Default acceptance cutoff for approximate matches
pub const DEFAULT_FUZZY_CUTOFF: f64 = 88.0;

/// Cutoff applied to short spans regardless of the caller's cutoff
pub const SHORT_SPAN_CUTOFF: f64 = 91.0;

/// Spans of at most this many characters (normalized) count as short
pub const SHORT_SPAN_CHARS: usize = 8;

/// Candidate count for structured-ID spans
pub const ID_TOP_K: usize = 3;

/// Candidate count for enzyme phrases and LLM proposals
pub const PHRASE_TOP_K: usize = 5;

/// Similarity of two strings as the Indel (insert/delete only) ratio, 0-100.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    100.0 * indel::normalized_similarity(a.chars(), b.chars())
}

/// Indel distance rescaled against a caller-chosen length sum.
fn scaled_similarity(distance: usize, lensum: usize) -> f64 {
    if lensum == 0 {
        return 100.0;
    }
    100.0 - 100.0 * distance as f64 / lensum as f64
}

/// Token-set similarity of two strings, 0-100.
///
/// Both strings are split on whitespace into token sets. The shared tokens
/// are compared against each side's leftovers, and the best of the three
/// pairings is returned.
///
/// ```
/// use bio_entity_linker::entity_linking::fuzzy::token_set_ratio;
///
/// assert_eq!(token_set_ratio("acetyl coa carboxylase", "carboxylase acetyl coa"), 100.0);
/// assert_eq!(token_set_ratio("what is cycloartenol synthase", "cycloartenol synthase"), 100.0);
/// assert_eq!(token_set_ratio("", "pyruvate"), 0.0);
/// ```
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersection.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 100.0;
    }

    // BTreeSet iteration is sorted, so the joins are canonical
    let diff_ab = only_a.join(" ");
    let diff_ba = only_b.join(" ");
    let ab_len = diff_ab.chars().count();
    let ba_len = diff_ba.chars().count();
    let sect_len = intersection.join(" ").chars().count();

    let joiner = usize::from(sect_len != 0);
    let sect_ab_len = sect_len + joiner + ab_len;
    let sect_ba_len = sect_len + joiner + ba_len;

    // the diff distance is scored against the full "sect + diff" lengths
    let diff_distance = indel::distance(diff_ab.chars(), diff_ba.chars());
    let result = scaled_similarity(diff_distance, sect_ab_len + sect_ba_len);

    if sect_len == 0 {
        return result;
    }

    // "sect" vs "sect + diff" differ only by the diff and its joining space
    let sect_ab_ratio = scaled_similarity(joiner + ab_len, sect_len + sect_ab_len);
    let sect_ba_ratio = scaled_similarity(joiner + ba_len, sect_len + sect_ba_len);

    result.max(sect_ab_ratio).max(sect_ba_ratio)
}

/// Effective cutoff for a normalized query.
pub fn effective_cutoff(query_norm: &str, cutoff: f64) -> f64 {
    if query_norm.chars().count() <= SHORT_SPAN_CHARS {
        SHORT_SPAN_CUTOFF
    } else {
        cutoff
    }
}

/// A vocabulary entry ranked against a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAlias {
    /// Position in the index vocabulary
    pub position: usize,
    pub score: f64,
}

/// Maps text spans onto the alias vocabulary of one index.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher<'a> {
    index: &'a AliasIndex,
    species_hint: Option<&'a str>,
}

impl<'a> FuzzyMatcher<'a> {
    pub fn new(index: &'a AliasIndex) -> Self {
        Self {
            index,
            species_hint: None,
        }
    }

    /// Restrict candidates to `hint` (plus the `all`/`unknown` sentinels).
    pub fn with_species_hint(mut self, hint: Option<&'a str>) -> Self {
        self.species_hint = hint;
        self
    }

    /// The best `top_k` vocabulary entries for `query_norm`, by descending
    /// score; equal scores keep vocabulary order.
    pub fn rank(&self, query_norm: &str, top_k: usize) -> Vec<RankedAlias> {
        if top_k == 0 {
            return Vec::new();
        }
        let mut ranked: Vec<RankedAlias> = self
            .index
            .vocabulary()
            .iter()
            .enumerate()
            .map(|(position, alias)| RankedAlias {
                position,
                score: token_set_ratio(query_norm, alias),
            })
            .collect();
        // stable sort preserves vocabulary order among ties
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(top_k);
        ranked
    }

    /// Candidates for an exact normalized alias, after species and database
    /// filtering. `None` when the alias is unknown.
    pub fn exact_candidates(
        &self,
        query_norm: &str,
        allowed: Option<&[Database]>,
    ) -> Option<Vec<&'a AliasRecord>> {
        self.index
            .lookup(query_norm)
            .map(|records| self.filter(records, allowed))
    }

    /// Candidates at vocabulary position `i`, after species and database
    /// filtering.
    pub fn candidates_at(&self, i: usize, allowed: Option<&[Database]>) -> Vec<&'a AliasRecord> {
        self.filter(self.index.candidates(i), allowed)
    }

    fn filter(&self, records: &'a [AliasRecord], allowed: Option<&[Database]>) -> Vec<&'a AliasRecord> {
        records
            .iter()
            .filter(|r| allowed.map_or(true, |dbs| dbs.contains(&r.database)))
            .filter(|r| species_allowed(&r.species, self.species_hint))
            .collect()
    }

    /// Map `text` (located at `span` in the original question) to entity hits.
    ///
    /// An exact alias returns all its candidates as `RegexExact` at
    /// confidence 1.0. Otherwise the `top_k` closest aliases scoring at least
    /// the effective cutoff become `RegexFuzzy` hits with confidence
    /// `score / 100`.
    pub fn match_span(
        &self,
        text: &str,
        span: (usize, usize),
        top_k: usize,
        cutoff: f64,
        allowed: Option<&[Database]>,
    ) -> Vec<Hit> {
        let query = normalize(text);
        if query.is_empty() {
            return Vec::new();
        }

        if let Some(records) = self.exact_candidates(&query, allowed) {
            return records
                .into_iter()
                .map(|r| Hit::from_record(r, text, span, HitSource::RegexExact, 1.0, Some(100.0)))
                .collect();
        }

        let cutoff = effective_cutoff(&query, cutoff);
        let mut hits = Vec::new();
        for ranked in self.rank(&query, top_k) {
            if ranked.score < cutoff {
                continue;
            }
            hits.extend(self.candidates_at(ranked.position, allowed).into_iter().map(|r| {
                Hit::from_record(
                    r,
                    text,
                    span,
                    HitSource::RegexFuzzy,
                    ranked.score / 100.0,
                    Some(ranked.score),
                )
            }));
        }
        hits
    }
}
