//! Path-hash registry.
//!
//! The mapping from path hash to relative path must stay injective: the hash
//! is the cache key, the path is what humans read back. A collision is a
//! hard error, not something to paper over.
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::checksum::{normalize_relative_path, path_checksum};
use crate::error::Error;

use super::{backend::ensure_cache_dir, PATH_CHECKSUM_COLUMN, PATH_MAP_FILENAME};

pub fn path_map_file(root: &Path) -> PathBuf {
    super::cache_dir(root).join(PATH_MAP_FILENAME)
}

fn ensure_path_map(root: &Path) -> Result<PathBuf, Error> {
    ensure_cache_dir(root)?;
    let file = path_map_file(root);
    if !file.exists() {
        let mut writer = csv::Writer::from_path(&file)?;
        writer.write_record([PATH_CHECKSUM_COLUMN, "relative_path"])?;
        writer.flush()?;
    }
    Ok(file)
}

/// Record the hash ↔ path mapping and return the hash. Registering the same
/// path twice is a no-op; a hash held by a different path is a
/// [Error::PathHashCollision].
pub fn register_path_hash(root: &Path, relative_path: &str) -> Result<String, Error> {
    let normalized = normalize_relative_path(relative_path);
    let hash = path_checksum(&normalized);
    let file = ensure_path_map(root)?;

    let mut reader = csv::Reader::from_path(&file)?;
    for record in reader.records() {
        let record = record.map_err(|e| Error::CacheCorrupt(format!("path map: {}", e)))?;
        if record.get(0) == Some(hash.as_str()) {
            let existing = record.get(1).unwrap_or_default();
            if !existing.is_empty() && existing != normalized {
                return Err(Error::PathHashCollision {
                    hash,
                    existing: existing.to_string(),
                    candidate: normalized,
                });
            }
            return Ok(hash);
        }
    }

    let handle = OpenOptions::new().append(true).open(&file)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(handle);
    writer.write_record([hash.as_str(), normalized.as_str()])?;
    writer.flush()?;
    Ok(hash)
}

/// Reverse lookup, for reporting.
pub fn relative_path_for_hash(root: &Path, hash: &str) -> Result<Option<String>, Error> {
    let file = path_map_file(root);
    if !file.exists() {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(&file)?;
    for record in reader.records() {
        let record = record.map_err(|e| Error::CacheCorrupt(format!("path map: {}", e)))?;
        if record.get(0) == Some(hash) {
            return Ok(record.get(1).map(str::to_string));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn register_is_idempotent() {
        let root = tempdir().unwrap();
        let first = register_path_hash(root.path(), "docs/intro.md").unwrap();
        let second = register_path_hash(root.path(), "./docs/intro.md").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, path_checksum("docs/intro.md"));
    }

    #[test]
    fn reverse_lookup_returns_normalized_path() {
        let root = tempdir().unwrap();
        let hash = register_path_hash(root.path(), "./docs/intro.md").unwrap();
        assert_eq!(
            relative_path_for_hash(root.path(), &hash).unwrap(),
            Some("docs/intro.md".to_string())
        );
    }

    #[test]
    fn collision_with_different_path_is_fatal() {
        let root = tempdir().unwrap();
        register_path_hash(root.path(), "a.md").unwrap();

        // forge a colliding row: same hash, different path
        let file = path_map_file(root.path());
        let forged = format!("{},{}\n", path_checksum("b.md"), "other.md");
        let mut contents = std::fs::read_to_string(&file).unwrap();
        contents.push_str(&forged);
        std::fs::write(&file, contents).unwrap();

        match register_path_hash(root.path(), "b.md") {
            Err(Error::PathHashCollision { .. }) => {}
            other => panic!("expected collision error, got {:?}", other),
        }
    }
}
