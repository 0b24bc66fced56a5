//! Alias index for in-memory entity resolution
//!
//! The `AliasIndex` groups alias records by normalized name and compiles the
//! distinct names into an Aho-Corasick automaton. It is built once from the
//! alias corpus, persisted to disk with bincode, and loaded into shared,
//! read-only memory (`Arc<AliasIndex>`). Reload means a full rebuild.
//!
//! Only the alias table is serialized; the automaton is derived state and is
//! recompiled from the stored pattern list on load.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};

use super::normalize::normalize;
use super::types::AliasRecord;
use crate::error::{LinkerError, Result};

/// Artifact format version - increment when the layout changes
pub const INDEX_VERSION: u32 = 1;

/// Aliases shorter than this (in characters, after normalization) are dropped
pub const DEFAULT_MIN_ALIAS_LEN: usize = 2;

#[derive(Serialize)]
struct ArtifactRef<'a> {
    version: u32,
    hash: &'a str,
    min_length: usize,
    aliases: &'a [String],
    candidates: &'a [Vec<AliasRecord>],
}

#[derive(Deserialize)]
struct Artifact {
    version: u32,
    hash: String,
    min_length: usize,
    aliases: Vec<String>,
    candidates: Vec<Vec<AliasRecord>>,
}

/// Immutable alias index: normalized alias → candidate records, plus the
/// automaton over all distinct aliases.
#[derive(Debug)]
pub struct AliasIndex {
    /// BLAKE3 over the alias table, used as the corpus version
    hash: String,
    min_length: usize,
    /// Distinct normalized aliases, in first-seen order (pattern ID = position)
    aliases: Vec<String>,
    /// Candidates per alias, parallel to `aliases`
    candidates: Vec<Vec<AliasRecord>>,
    lookup: HashMap<String, usize>,
    automaton: AhoCorasick,
}

impl AliasIndex {
    /// Build the index from alias records.
    ///
    /// Exact duplicate records are dropped; names that normalize to fewer than
    /// `min_length` characters are skipped.
    pub fn build<I>(records: I, min_length: usize) -> Result<Self>
    where
        I: IntoIterator<Item = AliasRecord>,
    {
        let mut aliases: Vec<String> = Vec::new();
        let mut candidates: Vec<Vec<AliasRecord>> = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::new();
        let mut seen: HashSet<AliasRecord> = HashSet::new();
        let mut skipped = 0usize;

        for record in records {
            let alias = normalize(&record.name);
            if alias.chars().count() < min_length {
                skipped += 1;
                continue;
            }
            if !seen.insert(record.clone()) {
                continue;
            }
            let slot = *lookup.entry(alias.clone()).or_insert_with(|| {
                aliases.push(alias);
                candidates.push(Vec::new());
                aliases.len() - 1
            });
            candidates[slot].push(record);
        }

        let hash = content_hash(min_length, &aliases, &candidates);
        let index = Self::from_parts(hash, min_length, aliases, candidates)?;
        tracing::info!(
            aliases = index.aliases.len(),
            records = index.record_count(),
            skipped,
            "Built alias automaton"
        );
        Ok(index)
    }

    fn from_parts(
        hash: String,
        min_length: usize,
        aliases: Vec<String>,
        candidates: Vec<Vec<AliasRecord>>,
    ) -> Result<Self> {
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&aliases)?;
        let lookup = aliases
            .iter()
            .enumerate()
            .map(|(i, alias)| (alias.clone(), i))
            .collect();

        Ok(Self {
            hash,
            min_length,
            aliases,
            candidates,
            lookup,
            automaton,
        })
    }

    /// Load an index from a bincode artifact.
    ///
    /// Any read, decode, version or integrity failure is `CacheCorrupt`: the
    /// caller must rebuild.
    pub fn load(path: &Path) -> Result<Self> {
        let corrupt = |reason: String| LinkerError::CacheCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = std::fs::read(path).map_err(|e| corrupt(format!("unreadable: {}", e)))?;
        let artifact: Artifact =
            bincode::deserialize(&bytes).map_err(|e| corrupt(format!("decode failed: {}", e)))?;

        if artifact.version != INDEX_VERSION {
            return Err(corrupt(format!(
                "version mismatch: expected {}, got {}",
                INDEX_VERSION, artifact.version
            )));
        }
        if artifact.aliases.len() != artifact.candidates.len() {
            return Err(corrupt(format!(
                "{} aliases but {} candidate lists",
                artifact.aliases.len(),
                artifact.candidates.len()
            )));
        }
        let expected = content_hash(artifact.min_length, &artifact.aliases, &artifact.candidates);
        if expected != artifact.hash {
            return Err(corrupt("content hash mismatch".to_string()));
        }

        let index = Self::from_parts(
            artifact.hash,
            artifact.min_length,
            artifact.aliases,
            artifact.candidates,
        )?;
        tracing::info!(path = %path.display(), aliases = index.aliases.len(), "Loaded alias cache");
        Ok(index)
    }

    /// Persist the index.
    ///
    /// Writes to a temp file beside `path` and renames it into place, so a
    /// reader never observes a partially written artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| LinkerError::CacheWrite {
            path: path.to_path_buf(),
            source,
        };

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(write_err)?;

        let bytes = bincode::serialize(&ArtifactRef {
            version: INDEX_VERSION,
            hash: &self.hash,
            min_length: self.min_length,
            aliases: &self.aliases,
            candidates: &self.candidates,
        })
        .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved alias cache");
        Ok(())
    }

    /// Candidates for an exact normalized alias.
    pub fn lookup(&self, alias_norm: &str) -> Option<&[AliasRecord]> {
        self.lookup
            .get(alias_norm)
            .map(|&i| self.candidates[i].as_slice())
    }

    /// All distinct normalized aliases, in build order.
    pub fn vocabulary(&self) -> &[String] {
        &self.aliases
    }

    /// Candidates for the alias at vocabulary position `i`.
    pub fn candidates(&self, i: usize) -> &[AliasRecord] {
        self.candidates.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every alias occurrence in `text` as `(alias position, start, end)`,
    /// overlapping occurrences included. Offsets are byte offsets.
    pub fn occurrences<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (usize, usize, usize)> + 'a {
        self.automaton
            .find_overlapping_iter(text)
            .map(|m| (m.pattern().as_usize(), m.start(), m.end()))
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.candidates.iter().map(Vec::len).sum()
    }

    /// Statistics for debugging
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            version: INDEX_VERSION,
            hash: self.hash.clone(),
            alias_count: self.aliases.len(),
            record_count: self.record_count(),
            max_candidates: self.candidates.iter().map(Vec::len).max().unwrap_or(0),
            min_length: self.min_length,
        }
    }
}

fn content_hash(min_length: usize, aliases: &[String], candidates: &[Vec<AliasRecord>]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(min_length as u64).to_le_bytes());
    for (alias, records) in aliases.iter().zip(candidates) {
        hasher.update(alias.as_bytes());
        hasher.update(&[0]);
        for record in records {
            for field in [
                record.id.as_str(),
                record.name.as_str(),
                record.species.as_str(),
                record.database.as_str(),
            ] {
                hasher.update(field.as_bytes());
                hasher.update(&[0x1f]);
            }
        }
        hasher.update(&[0x1e]);
    }
    hasher.finalize().to_hex().to_string()
}

/// Index statistics
#[derive(Debug, Clone)]
pub struct IndexStats {
    pub version: u32,
    pub hash: String,
    pub alias_count: usize,
    pub record_count: usize,
    pub max_candidates: usize,
    pub min_length: usize,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Alias Index Statistics:")?;
        writeln!(f, "  Version: {}", self.version)?;
        writeln!(f, "  Hash: {}", &self.hash[..self.hash.len().min(16)])?;
        writeln!(f, "  Distinct aliases: {}", self.alias_count)?;
        writeln!(f, "  Alias records: {}", self.record_count)?;
        writeln!(f, "  Largest candidate list: {}", self.max_candidates)?;
        writeln!(f, "  Minimum alias length: {}", self.min_length)?;
        Ok(())
    }
}

/// Process-level handle over loaded indexes.
///
/// Repeated loads of the same path return the same `Arc`, so every resolver
/// built from the registry shares one read-only copy. Rebuilds go through
/// [`IndexRegistry::publish`] or an explicit [`IndexRegistry::evict`].
#[derive(Debug, Default)]
pub struct IndexRegistry {
    loaded: Mutex<HashMap<PathBuf, Arc<AliasIndex>>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` once; later calls are served from memory.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<AliasIndex>> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(index) = loaded.get(path) {
            tracing::debug!(path = %path.display(), "Alias cache served from memory");
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(AliasIndex::load(path)?);
        loaded.insert(path.to_path_buf(), Arc::clone(&index));
        Ok(index)
    }

    /// Save a freshly built index to `path` and make it the registered copy.
    pub fn publish(&self, path: &Path, index: AliasIndex) -> Result<Arc<AliasIndex>> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|p| p.into_inner());
        index.save(path)?;
        let index = Arc::new(index);
        loaded.insert(path.to_path_buf(), Arc::clone(&index));
        Ok(index)
    }

    /// Drop the registered copy; resolvers holding the old `Arc` keep it.
    pub fn evict(&self, path: &Path) -> Option<Arc<AliasIndex>> {
        self.loaded
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(path)
    }
}
