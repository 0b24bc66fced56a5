//! Hit ranking and deduplication
//!
//! One total order decides every conflict between hits: span-level dedup,
//! entity-level dedup and the exact matcher's candidate ordering all go
//! through [`HitRanker`], so the stages cannot disagree.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::types::{Database, Hit};

/// Rank assigned to databases missing from the preference list.
pub const UNRANKED: usize = 999;

/// Database preference, most preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabasePriority(Vec<Database>);

impl Default for DatabasePriority {
    fn default() -> Self {
        Self(vec![
            Database::Gene,
            Database::Ortholog,
            Database::Compound,
            Database::Ec,
            Database::Reaction,
            Database::Pathway,
            Database::Other,
        ])
    }
}

impl DatabasePriority {
    pub fn new(order: Vec<Database>) -> Self {
        Self(order)
    }

    #[inline]
    pub fn rank(&self, database: Database) -> usize {
        self.0
            .iter()
            .position(|db| *db == database)
            .unwrap_or(UNRANKED)
    }

    pub fn order(&self) -> &[Database] {
        &self.0
    }
}

/// Total order over hits.
#[derive(Debug, Clone, Default)]
pub struct HitRanker {
    databases: DatabasePriority,
}

impl HitRanker {
    pub fn new(databases: DatabasePriority) -> Self {
        Self { databases }
    }

    pub fn databases(&self) -> &DatabasePriority {
        &self.databases
    }

    /// Preference between hits: ascending
    /// `(source rank, db rank, -confidence, -score)`. Hits that compare
    /// `Equal` here are equally trusted readings of their span.
    pub fn preference(&self, a: &Hit, b: &Hit) -> Ordering {
        a.source
            .rank()
            .cmp(&b.source.rank())
            .then_with(|| {
                self.databases
                    .rank(a.database)
                    .cmp(&self.databases.rank(b.database))
            })
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)))
    }

    /// Priority order: [`preference`](Self::preference), then identity fields
    /// so equal-preference hits never depend on arrival order.
    pub fn priority(&self, a: &Hit, b: &Hit) -> Ordering {
        self.preference(a, b)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.species.cmp(&b.species))
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.end.cmp(&b.end))
    }

    /// Output order: left to right, then database preference.
    pub fn position(&self, a: &Hit, b: &Hit) -> Ordering {
        a.start
            .cmp(&b.start)
            .then_with(|| {
                self.databases
                    .rank(a.database)
                    .cmp(&self.databases.rank(b.database))
            })
            .then_with(|| a.end.cmp(&b.end))
            .then_with(|| self.priority(a, b))
    }

    /// Keep the most preferred hits per `(start, end)`.
    ///
    /// Every hit tied with the best on [`preference`](Self::preference)
    /// survives, so an alias shared by several species keeps one hit per
    /// species and a species hint can only remove some of them.
    ///
    /// The key is raw offsets. `Ac` hits index the normalized question and
    /// every other source indexes the original, so an automaton hit can
    /// displace an unrelated hit whose numbers happen to coincide once
    /// normalization has shifted the text.
    pub fn dedup_by_span(&self, hits: Vec<Hit>) -> Vec<Hit> {
        let mut groups: HashMap<(usize, usize), Vec<Hit>> = HashMap::new();
        for hit in hits {
            groups.entry((hit.start, hit.end)).or_default().push(hit);
        }

        let mut kept: Vec<Hit> = Vec::new();
        for group in groups.into_values() {
            let Some(best) = group.iter().min_by(|a, b| self.preference(a, b)).cloned() else {
                continue;
            };
            kept.extend(
                group
                    .into_iter()
                    .filter(|hit| self.preference(hit, &best) == Ordering::Equal),
            );
        }
        kept.sort_by(|a, b| self.position(a, b));
        kept
    }

    /// Keep the best-priority hit per `(id, database, species)`.
    pub fn dedup_by_entity(&self, hits: Vec<Hit>) -> Vec<Hit> {
        self.keep_best_by(hits, |hit| {
            (hit.id.clone(), hit.database, hit.species.clone())
        })
    }

    fn keep_best_by<K, F>(&self, hits: Vec<Hit>, key: F) -> Vec<Hit>
    where
        K: Eq + Hash,
        F: Fn(&Hit) -> K,
    {
        let mut best: HashMap<K, Hit> = HashMap::with_capacity(hits.len());
        for hit in hits {
            match best.entry(key(&hit)) {
                std::collections::hash_map::Entry::Occupied(mut slot) => {
                    if self.priority(&hit, slot.get()) == Ordering::Less {
                        slot.insert(hit);
                    }
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(hit);
                }
            }
        }
        let mut kept: Vec<Hit> = best.into_values().collect();
        kept.sort_by(|a, b| self.position(a, b));
        kept
    }
}
