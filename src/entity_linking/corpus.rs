//! Alias corpus loading
//!
//! Reads `ID_map_*.csv` tables (columns `id`, `name`, optional `species`) and
//! tags every row with the database named in the file name.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::snapshot::AliasIndex;
use super::types::{AliasRecord, Database, SPECIES_ALL};
use crate::error::{LinkerError, Result};

/// File name prefix of alias tables
pub const ALIAS_FILE_PREFIX: &str = "ID_map_";

/// List alias tables in `dir`, sorted by file name.
pub fn alias_tables(dir: &Path) -> Result<Vec<PathBuf>> {
    let unavailable = |reason: String| LinkerError::SourceUnavailable {
        path: dir.to_path_buf(),
        reason,
    };

    let entries = std::fs::read_dir(dir).map_err(|e| unavailable(e.to_string()))?;
    let mut tables: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(ALIAS_FILE_PREFIX) && n.ends_with(".csv"))
                .unwrap_or(false)
        })
        .collect();
    tables.sort();

    if tables.is_empty() {
        return Err(unavailable(format!("no {}*.csv files", ALIAS_FILE_PREFIX)));
    }
    Ok(tables)
}

/// Read one alias table, tagging rows with `database`.
pub fn read_alias_table(path: &Path, database: Database) -> Result<Vec<AliasRecord>> {
    let unavailable = |reason: String| LinkerError::SourceUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| unavailable(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| unavailable(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);

    let id_col = column("id").ok_or_else(|| unavailable("missing 'id' column".to_string()))?;
    let name_col =
        column("name").ok_or_else(|| unavailable("missing 'name' column".to_string()))?;
    let species_col = column("species");

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| unavailable(e.to_string()))?;
        let species = species_col
            .and_then(|i| row.get(i))
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| SPECIES_ALL.to_string());

        records.push(AliasRecord {
            id: row.get(id_col).unwrap_or_default().trim().to_string(),
            name: row.get(name_col).unwrap_or_default().to_string(),
            species,
            database,
        });
    }

    tracing::debug!(path = %path.display(), %database, rows = records.len(), "Read alias table");
    Ok(records)
}

/// Load and merge every alias table in `dir`, dropping exact duplicates.
pub fn load_alias_records(dir: &Path) -> Result<Vec<AliasRecord>> {
    let mut seen: HashSet<AliasRecord> = HashSet::new();
    let mut merged = Vec::new();

    for table in alias_tables(dir)? {
        let file_name = table
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let database = Database::from_file_name(&file_name);
        for record in read_alias_table(&table, database)? {
            if seen.insert(record.clone()) {
                merged.push(record);
            }
        }
    }

    tracing::info!(dir = %dir.display(), records = merged.len(), "Loaded alias corpus");
    Ok(merged)
}

/// Build an index from a directory of alias tables and persist it.
pub fn build_from_dir(dir: &Path, cache_path: &Path, min_length: usize) -> Result<AliasIndex> {
    let records = load_alias_records(dir)?;
    let index = AliasIndex::build(records, min_length)?;
    index.save(cache_path)?;
    Ok(index)
}

/// Load the cached index, rebuilding it from `dir` when the cache is missing,
/// stale (format version) or corrupt.
pub fn load_or_build(cache_path: &Path, dir: &Path, min_length: usize) -> Result<AliasIndex> {
    match AliasIndex::load(cache_path) {
        Ok(index) if index.min_length() == min_length => Ok(index),
        Ok(index) => {
            tracing::info!(
                cached = index.min_length(),
                wanted = min_length,
                "Alias cache built with another minimum length, rebuilding"
            );
            build_from_dir(dir, cache_path, min_length)
        }
        Err(LinkerError::CacheCorrupt { reason, .. }) => {
            tracing::warn!(path = %cache_path.display(), %reason, "Alias cache unusable, rebuilding");
            build_from_dir(dir, cache_path, min_length)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::snapshot::DEFAULT_MIN_ALIAS_LEN;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_load_tags_database_from_file_name() {
        let dir = tempdir().unwrap();
        write(dir.path(), "ID_map_compound.csv", "ID,Name\nC00022,Pyruvate\n");
        write(
            dir.path(),
            "ID_map_gene.csv",
            "id,name,species\nath:AT1G01010,NAC001,ATH\ngmx:100101,NAC001,\n",
        );
        write(dir.path(), "notes.csv", "id,name\nX,ignored\n");

        let records = load_alias_records(dir.path()).unwrap();
        assert_eq!(records.len(), 3);

        let pyruvate = records.iter().find(|r| r.id == "C00022").unwrap();
        assert_eq!(pyruvate.database, Database::Compound);
        assert_eq!(pyruvate.species, SPECIES_ALL);

        let nac = records.iter().find(|r| r.id == "ath:AT1G01010").unwrap();
        assert_eq!(nac.database, Database::Gene);
        assert_eq!(nac.species, "ath");

        let blank_species = records.iter().find(|r| r.id == "gmx:100101").unwrap();
        assert_eq!(blank_species.species, SPECIES_ALL);
    }

    #[test]
    fn test_duplicates_across_tables_dropped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "ID_map_compound_a.csv", "id,name\nC00022,Pyruvate\n");
        write(dir.path(), "ID_map_compound_b.csv", "id,name\nC00022,Pyruvate\n");
        assert_eq!(load_alias_records(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_dir_is_source_unavailable() {
        let dir = tempdir().unwrap();
        let err = load_alias_records(dir.path()).unwrap_err();
        assert!(matches!(err, LinkerError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_missing_dir_is_source_unavailable() {
        let dir = tempdir().unwrap();
        let err = load_alias_records(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, LinkerError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_missing_name_column() {
        let dir = tempdir().unwrap();
        write(dir.path(), "ID_map_pathway.csv", "id,label\nmap00010,Glycolysis\n");
        let err = load_alias_records(dir.path()).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_build_from_dir_writes_cache() {
        let dir = tempdir().unwrap();
        write(dir.path(), "ID_map_pathway.csv", "id,name\nmap00010,Glycolysis / Gluconeogenesis\n");
        let cache = dir.path().join("aliases.bin");

        let index = build_from_dir(dir.path(), &cache, DEFAULT_MIN_ALIAS_LEN).unwrap();
        assert!(cache.exists());
        assert_eq!(index.len(), 1);
        assert_eq!(AliasIndex::load(&cache).unwrap().hash(), index.hash());
    }

    #[test]
    fn test_load_or_build_recovers_from_corrupt_cache() {
        let dir = tempdir().unwrap();
        write(dir.path(), "ID_map_compound.csv", "id,name\nC00022,Pyruvate\n");
        let cache = dir.path().join("aliases.bin");
        std::fs::write(&cache, b"garbage").unwrap();

        let index = load_or_build(&cache, dir.path(), DEFAULT_MIN_ALIAS_LEN).unwrap();
        assert!(index.lookup("pyruvate").is_some());
        // the rebuilt artifact now loads cleanly
        assert_eq!(AliasIndex::load(&cache).unwrap().hash(), index.hash());
    }

    #[test]
    fn test_load_or_build_prefers_cache() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("aliases.bin");
        AliasIndex::build(
            vec![AliasRecord::new("C00022", "Pyruvate", "all", Database::Compound)],
            DEFAULT_MIN_ALIAS_LEN,
        )
        .unwrap()
        .save(&cache)
        .unwrap();

        // no alias tables: only the cache can satisfy this
        let index = load_or_build(&cache, &dir.path().join("nope"), DEFAULT_MIN_ALIAS_LEN).unwrap();
        assert_eq!(index.len(), 1);
    }
}
