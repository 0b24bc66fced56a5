//! Core types shared by every mention source.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Species sentinel for aliases valid in every organism.
pub const SPECIES_ALL: &str = "all";

/// Species sentinel for aliases whose organism is not recorded.
pub const SPECIES_UNKNOWN: &str = "unknown";

/// Entity category an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Gene,
    Ortholog,
    Compound,
    Ec,
    Reaction,
    Pathway,
    /// Functional unit (KEGG module)
    Module,
    Other,
}

impl Database {
    pub const ALL: [Database; 8] = [
        Database::Gene,
        Database::Ortholog,
        Database::Compound,
        Database::Ec,
        Database::Reaction,
        Database::Pathway,
        Database::Module,
        Database::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Database::Gene => "gene",
            Database::Ortholog => "ortholog",
            Database::Compound => "compound",
            Database::Ec => "ec",
            Database::Reaction => "reaction",
            Database::Pathway => "pathway",
            Database::Module => "module",
            Database::Other => "other",
        }
    }

    /// Infer the database from an alias table file name
    /// (e.g. `ID_map_compound.csv` → `Compound`).
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        const RULES: &[(&str, Database)] = &[
            ("compound", Database::Compound),
            ("enzyme", Database::Ec),
            ("reaction", Database::Reaction),
            ("pathway", Database::Pathway),
            ("ortholog", Database::Ortholog),
            ("gene", Database::Gene),
            ("module", Database::Module),
        ];
        RULES
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, db)| *db)
            .unwrap_or(Database::Other)
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Database {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gene" => Ok(Database::Gene),
            "ortholog" | "ko" => Ok(Database::Ortholog),
            "compound" => Ok(Database::Compound),
            "ec" | "enzyme" => Ok(Database::Ec),
            "reaction" => Ok(Database::Reaction),
            "pathway" => Ok(Database::Pathway),
            "module" | "functional_unit" => Ok(Database::Module),
            "other" | "-" => Ok(Database::Other),
            other => Err(format!("unknown database '{}'", other)),
        }
    }
}

/// Which pipeline produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitSource {
    /// Alias automaton over normalized text
    #[serde(rename = "ac")]
    Ac,
    /// Structured identifier recognized by shape alone
    #[serde(rename = "regex-id")]
    RegexId,
    /// Regex span whose normalized text is a known alias
    #[serde(rename = "regex-exact")]
    RegexExact,
    /// Regex span matched approximately against the vocabulary
    #[serde(rename = "regex-fuzzy")]
    RegexFuzzy,
    /// LLM-proposed span that is a known alias
    #[serde(rename = "llm-exact")]
    LlmExact,
    /// LLM-proposed span matched approximately
    #[serde(rename = "llm-fuzzy")]
    LlmFuzzy,
}

impl HitSource {
    /// Trust rank, lower is more trusted.
    pub fn rank(&self) -> u8 {
        match self {
            HitSource::Ac => 0,
            HitSource::RegexExact => 1,
            HitSource::RegexId => 2,
            HitSource::RegexFuzzy => 3,
            HitSource::LlmExact => 4,
            HitSource::LlmFuzzy => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HitSource::Ac => "ac",
            HitSource::RegexId => "regex-id",
            HitSource::RegexExact => "regex-exact",
            HitSource::RegexFuzzy => "regex-fuzzy",
            HitSource::LlmExact => "llm-exact",
            HitSource::LlmFuzzy => "llm-fuzzy",
        }
    }
}

impl fmt::Display for HitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored synonym for a graph entity. Not unique: the same name may
/// appear under several species or databases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasRecord {
    pub id: String,
    /// Raw alias text as it appears in the corpus
    pub name: String,
    pub species: String,
    pub database: Database,
}

impl AliasRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        species: impl Into<String>,
        database: Database,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            species: species.into(),
            database,
        }
    }
}

/// Whether a candidate with `species` survives the optional species hint.
pub fn species_allowed(species: &str, hint: Option<&str>) -> bool {
    match hint {
        None => true,
        Some(hint) => species == hint || species == SPECIES_ALL || species == SPECIES_UNKNOWN,
    }
}

/// A candidate mention produced by one source. Offsets are byte offsets into
/// the text the source scanned (normalized text for `Ac`, the original
/// question otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub id: String,
    pub database: Database,
    pub species: String,
    pub source: HitSource,
    pub confidence: f64,
    pub score: Option<f64>,
}

impl Hit {
    pub(crate) fn from_record(
        record: &AliasRecord,
        text: &str,
        span: (usize, usize),
        source: HitSource,
        confidence: f64,
        score: Option<f64>,
    ) -> Self {
        Self {
            text: text.to_string(),
            start: span.0,
            end: span.1,
            id: record.id.clone(),
            database: record.database,
            species: record.species.clone(),
            source,
            confidence,
            score,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &Hit) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A resolved reference from a question span to one entity identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub text: String,
    pub id: String,
    pub database: Database,
    pub species: String,
    pub start: usize,
    pub end: usize,
    pub source: HitSource,
    pub confidence: f64,
}

impl From<Hit> for Mention {
    fn from(hit: Hit) -> Self {
        Self {
            text: hit.text,
            id: hit.id,
            database: hit.database,
            species: hit.species,
            start: hit.start,
            end: hit.end,
            source: hit.source,
            confidence: hit.confidence,
        }
    }
}

impl Mention {
    /// Placeholder key used by query templates, e.g. `{COMPOUND_ID}`.
    pub fn placeholder(&self) -> String {
        format!("{{{}_ID}}", self.database.as_str().to_uppercase())
    }
}
