//! Structured identifier and enzyme-phrase recognition
//!
//! Fixed regexes over the original question text:
//! - KEGG-style codes: compound `C#####`, ortholog `K#####`, reaction `R#####`
//! - EC numbers with optional `EC` prefix and wildcard last segment
//! - Enzyme-name phrases ending in one of the catalytic suffix morphemes

use std::sync::LazyLock;

use regex::Regex;

use super::types::{Database, Hit, HitSource, SPECIES_ALL};

/// Databases an enzyme phrase may resolve to.
pub const ENZYME_DATABASES: &[Database] = &[Database::Ec, Database::Ortholog];

/// Suffix morphemes that mark an enzyme name.
pub const ENZYME_SUFFIXES: &[&str] = &[
    "dehydrogenase",
    "oxidoreductase",
    "oxygenase",
    "monooxygenase",
    "dioxygenase",
    "kinase",
    "phosphatase",
    "phospholipase",
    "carboxylase",
    "carboxykinase",
    "synthase",
    "synthetase",
    "transferase",
    "acyltransferase",
    "aminotransferase",
    "lyase",
    "dehydratase",
    "hydrolase",
    "isomerase",
    "mutase",
    "epimerase",
    "racemase",
    "ligase",
    "cyclase",
    "reductase",
];

static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bC[0-9]{5}\b",
        r"\bK[0-9]{5}\b",
        r"\bR[0-9]{5}\b",
        // `-` is not a word character, so the wildcard ends on `\B`
        r"(?i)\b(?:EC[:\s])?[0-9]+\.[0-9]+\.[0-9]+\.(?:(?:[0-9]+|x|n)\b|-\B)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static EC_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?i:EC)[:\s]*").unwrap());

// Lowercase-initial run of at most 60 characters, lazily extended up to the
// first suffix morpheme.
static ENZYME_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b[a-z][a-z0-9\-\s]{{0,60}}?(?:{})\b",
        ENZYME_SUFFIXES.join("|")
    ))
    .unwrap()
});

/// A regex-recognized span of the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Structured-ID spans, deduplicated by `(start, end)` across patterns.
pub fn id_spans(question: &str) -> Vec<PatternSpan> {
    let mut spans: Vec<PatternSpan> = Vec::new();
    for pattern in ID_PATTERNS.iter() {
        for m in pattern.find_iter(question) {
            if spans.iter().any(|s| s.start == m.start() && s.end == m.end()) {
                continue;
            }
            spans.push(PatternSpan {
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
    }
    spans
}

/// Classify a structured ID by its leading character and canonicalize it.
pub fn classify_id(raw: &str) -> (Database, String) {
    match raw.chars().next() {
        Some('K') | Some('k') => (Database::Ortholog, raw.to_uppercase()),
        Some('C') | Some('c') => (Database::Compound, raw.to_uppercase()),
        Some('R') | Some('r') => (Database::Reaction, raw.to_uppercase()),
        _ => (Database::Ec, normalize_ec(raw)),
    }
}

/// Strip an `EC` prefix; the wildcard last segment is preserved.
///
/// ```
/// use bio_entity_linker::entity_linking::patterns::normalize_ec;
///
/// assert_eq!(normalize_ec("EC:1.1.1.1"), "1.1.1.1");
/// assert_eq!(normalize_ec("ec 2.3.1.-"), "2.3.1.-");
/// ```
pub fn normalize_ec(raw: &str) -> String {
    EC_PREFIX.replace(raw.trim(), "").into_owned()
}

/// Databases a structured ID may resolve to through the vocabulary.
pub fn id_databases(raw: &str) -> &'static [Database] {
    match classify_id(raw).0 {
        Database::Ortholog => &[Database::Ortholog],
        Database::Compound => &[Database::Compound],
        Database::Reaction => &[Database::Reaction],
        _ => &[Database::Ec],
    }
}

/// Direct hits for every structured ID in `question`.
pub fn extract_ids(question: &str) -> Vec<Hit> {
    id_spans(question)
        .into_iter()
        .map(|span| {
            let (database, id) = classify_id(&span.text);
            Hit {
                text: span.text,
                start: span.start,
                end: span.end,
                id,
                database,
                species: SPECIES_ALL.to_string(),
                source: HitSource::RegexId,
                confidence: 1.0,
                score: None,
            }
        })
        .collect()
}

/// Enzyme-name phrases in `text`.
pub fn enzyme_phrases(text: &str) -> Vec<PatternSpan> {
    ENZYME_PHRASE
        .find_iter(text)
        .map(|m| PatternSpan {
            text: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// First enzyme phrase embedded in `text`, if any.
pub fn find_enzyme_phrase(text: &str) -> Option<PatternSpan> {
    ENZYME_PHRASE.find(text).map(|m| PatternSpan {
        text: m.as_str().to_string(),
        start: m.start(),
        end: m.end(),
    })
}
