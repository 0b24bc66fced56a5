//! Exact alias matching over normalized text
//!
//! Every automaton occurrence becomes one hit per surviving candidate; the
//! overlapping occurrences are then reduced to a non-overlapping set by
//! greedy interval scheduling (longest span first, earliest start on ties).

use super::ranking::HitRanker;
use super::snapshot::AliasIndex;
use super::types::{species_allowed, Hit, HitSource};

/// Find all known aliases in `normalized` text.
///
/// Offsets index the normalized text. Candidates are filtered by the species
/// hint before overlap resolution, so a filtered-out candidate never blocks a
/// shorter alias.
pub fn search(
    normalized: &str,
    index: &AliasIndex,
    species_hint: Option<&str>,
    ranker: &HitRanker,
) -> Vec<Hit> {
    let vocabulary = index.vocabulary();
    let mut hits = Vec::new();

    for (alias_pos, start, end) in index.occurrences(normalized) {
        let alias = &vocabulary[alias_pos];
        hits.extend(
            index
                .candidates(alias_pos)
                .iter()
                .filter(|c| species_allowed(&c.species, species_hint))
                .map(|c| Hit::from_record(c, alias, (start, end), HitSource::Ac, 1.0, None)),
        );
    }

    let raw = hits.len();
    let kept = resolve_overlaps(hits, normalized.len(), ranker);
    tracing::debug!(raw, kept = kept.len(), "Exact alias matches");
    kept
}

/// Reduce hits to a non-overlapping set.
///
/// Hits are visited longest first, then earliest start; a span is accepted
/// only if none of its positions is already used. All candidates of an
/// accepted span are kept together, so the result never depends on which
/// candidate happened to be visited first. Output order is
/// `(start, database priority)`.
pub fn resolve_overlaps(mut hits: Vec<Hit>, text_len: usize, ranker: &HitRanker) -> Vec<Hit> {
    hits.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| ranker.priority(a, b))
    });

    let mut used = vec![false; text_len];
    let mut accepted: Option<(usize, usize)> = None;
    let mut kept = Vec::new();

    for hit in hits {
        let span = (hit.start, hit.end);
        if accepted == Some(span) {
            kept.push(hit);
            continue;
        }
        if hit.is_empty() || hit.end > text_len || used[hit.start..hit.end].iter().any(|&u| u) {
            continue;
        }
        used[hit.start..hit.end].fill(true);
        accepted = Some(span);
        kept.push(hit);
    }

    kept.sort_by(|a, b| ranker.position(a, b));
    kept
}
