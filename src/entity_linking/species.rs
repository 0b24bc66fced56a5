//! Species hint inference
//!
//! A question that names an organism ("in Arabidopsis", "soybean genes")
//! narrows every source to aliases of that species.

use serde::{Deserialize, Serialize};

use super::normalize::normalize;

/// One keyword → species code rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesKeyword {
    pub keyword: String,
    pub species: String,
}

/// Ordered keyword table; the first keyword present wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesHints(Vec<SpeciesKeyword>);

impl Default for SpeciesHints {
    fn default() -> Self {
        Self::from_pairs(&[
            ("arabidopsis", "ath"),
            ("ath", "ath"),
            ("thaliana", "ath"),
            ("soybean", "gmx"),
            ("glycine", "gmx"),
            ("gmx", "gmx"),
            ("camelina", "csat"),
            ("csat", "csat"),
            ("aegilops tauschii", "ats"),
            ("ats", "ats"),
        ])
    }
}

impl SpeciesHints {
    pub fn new(rules: Vec<SpeciesKeyword>) -> Self {
        Self(rules)
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(keyword, species)| SpeciesKeyword {
                    keyword: keyword.to_string(),
                    species: species.to_string(),
                })
                .collect(),
        )
    }

    pub fn rules(&self) -> &[SpeciesKeyword] {
        &self.0
    }

    /// Species code for the first keyword that occurs in `normalized` as a
    /// whole word or phrase.
    ///
    /// Matching is on word boundaries: "ath" does not fire inside "pathway",
    /// while trailing punctuation ("soybean?") does not hide a keyword.
    pub fn guess(&self, normalized: &str) -> Option<&str> {
        let padded = format!(" {} ", words(normalized));
        self.0
            .iter()
            .find(|rule| {
                let keyword = words(&normalize(&rule.keyword));
                !keyword.is_empty() && padded.contains(&format!(" {} ", keyword))
            })
            .map(|rule| rule.species.as_str())
    }
}

fn words(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
