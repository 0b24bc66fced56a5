//! Text normalization for alias matching
//!
//! The same function runs over corpus aliases at build time and over
//! questions at query time, so its output must be byte-for-byte stable:
//! - Unicode NFKC fold
//! - Lowercase conversion
//! - Greek letters spelled out in Latin
//! - Bracketed annotations dropped, parenthetical annotations dropped unless
//!   they carry a digit or an R/S chirality marker
//! - `&`, hyphens and arrows rewritten as words/spaces
//! - Separator punctuation and whitespace collapsed

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const GREEK_LETTERS: &[(char, &str)] = &[
    ('α', "alpha"),
    ('β', "beta"),
    ('γ', "gamma"),
    ('δ', "delta"),
    ('ε', "epsilon"),
    ('κ', "kappa"),
    ('λ', "lambda"),
    // NFKC has already folded the micro sign into μ
    ('μ', "mu"),
    ('ω', "omega"),
];

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\[\]]*\]").unwrap());

// Content with a digit or an r/s letter is structural ("(2E)", "(R)") and kept.
static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^()\drs]+\)").unwrap());

/// Normalize alias or question text for matching.
///
/// # Examples
///
/// ```
/// use bio_entity_linker::entity_linking::normalize::normalize;
///
/// assert_eq!(normalize("α-Linolenic acid"), "alpha linolenic acid");
/// assert_eq!(normalize("eco:b0001"), "eco b0001");
/// assert_eq!(normalize("Acetyl-CoA [cytosol]"), "acetyl coa");
/// assert_eq!(normalize("(R)-Mevalonate"), "(r) mevalonate");
/// ```
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();

    let mut spelled = String::with_capacity(folded.len());
    for c in folded.chars() {
        match GREEK_LETTERS.iter().find(|(greek, _)| *greek == c) {
            Some((_, latin)) => spelled.push_str(latin),
            None => spelled.push(c),
        }
    }

    let stripped = strip_to_fixed_point(&PARENTHETICAL, strip_to_fixed_point(&BRACKETED, spelled));

    let worded = stripped
        .replace('→', " to ")
        .replace("->", " to ")
        .replace('&', " and ")
        .replace('-', " ");

    worded
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':'))
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove matches repeatedly so nested annotations ("[a [b] c]") vanish in
/// a single pass of `normalize`.
fn strip_to_fixed_point(pattern: &Regex, mut text: String) -> String {
    loop {
        let next = pattern.replace_all(&text, "");
        if next == text {
            return text;
        }
        text = next.into_owned();
    }
}

/// Tokenize already-normalized text.
pub fn tokenize(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|t| !t.is_empty()).collect()
}
