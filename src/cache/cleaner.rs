/*! Cache cleaning.

Two operations: `clear_missing_chunks` drops rows and cells that reference
blobs no longer on disk (then sweeps orphaned source blobs), and `clear_all`
is the four-way `(language?, path?)` selector with an optional keyword filter
in all-mode. Both report what they touched.
!*/
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::checksum::path_checksum;
use crate::error::Error;
use crate::lang::Lang;

use super::backend::blob_exists;
use super::correspondence::Table;
use super::{cache_dir, PATH_CHECKSUM_COLUMN};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClearMissingStats {
    pub rows_removed: usize,
    pub fields_cleared: usize,
    pub source_chunks_removed: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClearAllStats {
    pub rows_removed: usize,
    pub fields_cleared: usize,
    pub chunk_files_removed: usize,
}

/// `(path_hash, checksum, file)` triples under one language directory.
/// Top-level files (legacy layout without a path scope) get an empty hash.
fn lang_cache_files(cache: &Path, lang_name: &str) -> Vec<(String, String, PathBuf)> {
    let lang_dir = cache.join(lang_name);
    let mut files = Vec::new();
    let Ok(entries) = fs::read_dir(&lang_dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let path_hash = entry.file_name().to_string_lossy().into_owned();
            let Ok(inner) = fs::read_dir(&path) else {
                continue;
            };
            for file in inner.flatten() {
                if file.path().is_file() {
                    files.push((
                        path_hash.clone(),
                        file.file_name().to_string_lossy().into_owned(),
                        file.path(),
                    ));
                }
            }
        } else if path.is_file() {
            files.push((
                String::new(),
                entry.file_name().to_string_lossy().into_owned(),
                path,
            ));
        }
    }
    files
}

/// Drop rows whose source blob is gone, clear target cells whose blob is
/// gone, drop rows left without any target, then delete source blobs no
/// surviving row references.
pub fn clear_missing_chunks(root: &Path, source_lang: Lang) -> Result<ClearMissingStats, Error> {
    let mut stats = ClearMissingStats::default();
    let cache = cache_dir(root);
    if !cache.exists() {
        return Ok(stats);
    }

    let source_files = lang_cache_files(&cache, source_lang.name());

    let Some(mut table) = Table::read(root)? else {
        // no table: every source blob is unreferenced
        for (_, _, file) in source_files {
            fs::remove_file(file)?;
            stats.source_chunks_removed += 1;
        }
        return Ok(stats);
    };

    let target_cols: Vec<String> = table
        .language_fields()
        .into_iter()
        .filter(|f| f != source_lang.name())
        .collect();

    let mut referenced: Vec<(String, String)> = Vec::new();
    let mut remaining = Vec::new();
    for mut row in table.rows.drain(..) {
        let path_hash = row
            .get(PATH_CHECKSUM_COLUMN)
            .cloned()
            .unwrap_or_default();
        let src_checksum = row.get(source_lang.name()).cloned().unwrap_or_default();
        if src_checksum.is_empty()
            || !blob_exists(root, &src_checksum, source_lang.name(), &path_hash)
        {
            stats.rows_removed += 1;
            continue;
        }

        let mut present_targets = 0;
        let mut missing: Vec<&String> = Vec::new();
        for col in &target_cols {
            let tgt = row.get(col).map(String::as_str).unwrap_or("");
            if tgt.is_empty() {
                continue;
            }
            if blob_exists(root, tgt, col, &path_hash) {
                present_targets += 1;
            } else {
                missing.push(col);
            }
        }

        if present_targets == 0 {
            stats.rows_removed += 1;
            continue;
        }

        stats.fields_cleared += missing.len();
        let missing: Vec<String> = missing.into_iter().cloned().collect();
        for col in missing {
            row.insert(col, String::new());
        }
        referenced.push((path_hash, src_checksum));
        remaining.push(row);
    }

    table.rows = remaining;
    if stats.rows_removed > 0 || stats.fields_cleared > 0 {
        table.write(root)?;
    }

    for (path_hash, digest, file) in source_files {
        if referenced.contains(&(path_hash, digest)) {
            continue;
        }
        if file.exists() {
            fs::remove_file(file)?;
            stats.source_chunks_removed += 1;
        }
    }

    info!(
        "clear-missing: {} rows removed, {} fields cleared, {} source chunks removed",
        stats.rows_removed, stats.fields_cleared, stats.source_chunks_removed
    );
    Ok(stats)
}

fn remove_dir_counting(dir: &Path, removed: &mut usize) -> Result<(), Error> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            remove_dir_counting(&path, removed)?;
        } else {
            fs::remove_file(&path)?;
            *removed += 1;
        }
    }
    fs::remove_dir(dir)?;
    Ok(())
}

fn row_is_empty(row: &std::collections::HashMap<String, String>, langs: &[String]) -> bool {
    langs
        .iter()
        .all(|l| row.get(l).map(String::as_str).unwrap_or("").is_empty())
}

/// Four-way selector over `(language?, path?)`, with an optional keyword
/// restricting all-mode to rows whose source blob contains it.
pub fn clear_all(
    root: &Path,
    source_lang: Lang,
    lang: Option<Lang>,
    relative_path: Option<&str>,
    keyword: Option<&str>,
) -> Result<ClearAllStats, Error> {
    let mut stats = ClearAllStats::default();
    let cache = cache_dir(root);
    if !cache.exists() {
        return Ok(stats);
    }
    if keyword.is_some() && (lang.is_some() || relative_path.is_some()) {
        return Err(Error::Custom(
            "keyword filter is only valid when clearing the whole cache".to_string(),
        ));
    }

    let path_hash = relative_path.map(path_checksum);
    let table = Table::read(root)?;

    match (lang, path_hash) {
        (None, None) => match keyword {
            Some(keyword) => clear_by_keyword(root, source_lang, keyword, table, &mut stats)?,
            None => {
                if let Some(mut table) = table {
                    stats.rows_removed = table.rows.len();
                    table.rows.clear();
                    table.write(root)?;
                }
                for lang in crate::lang::LANG {
                    remove_dir_counting(&cache.join(lang.name()), &mut stats.chunk_files_removed)?;
                }
            }
        },
        (Some(lang), None) => {
            remove_dir_counting(&cache.join(lang.name()), &mut stats.chunk_files_removed)?;
            if let Some(mut table) = table {
                let other_langs: Vec<String> = table
                    .language_fields()
                    .into_iter()
                    .filter(|f| f != lang.name())
                    .collect();
                let mut remaining = Vec::new();
                for mut row in table.rows.drain(..) {
                    if !row.get(lang.name()).map(String::as_str).unwrap_or("").is_empty() {
                        row.insert(lang.name().to_string(), String::new());
                        stats.fields_cleared += 1;
                    }
                    if row_is_empty(&row, &other_langs) {
                        stats.rows_removed += 1;
                    } else {
                        remaining.push(row);
                    }
                }
                table.rows = remaining;
                table.write(root)?;
            }
        }
        (None, Some(path_hash)) => {
            for lang in crate::lang::LANG {
                remove_dir_counting(
                    &cache.join(lang.name()).join(&path_hash),
                    &mut stats.chunk_files_removed,
                )?;
            }
            if let Some(mut table) = table {
                let before = table.rows.len();
                table.rows.retain(|row| {
                    row.get(PATH_CHECKSUM_COLUMN).map(String::as_str) != Some(path_hash.as_str())
                });
                stats.rows_removed = before - table.rows.len();
                table.write(root)?;
            }
        }
        (Some(lang), Some(path_hash)) => {
            remove_dir_counting(
                &cache.join(lang.name()).join(&path_hash),
                &mut stats.chunk_files_removed,
            )?;
            if let Some(mut table) = table {
                let other_langs: Vec<String> = table
                    .language_fields()
                    .into_iter()
                    .filter(|f| f != lang.name())
                    .collect();
                let mut remaining = Vec::new();
                for mut row in table.rows.drain(..) {
                    let matches = row.get(PATH_CHECKSUM_COLUMN).map(String::as_str)
                        == Some(path_hash.as_str());
                    if matches
                        && !row.get(lang.name()).map(String::as_str).unwrap_or("").is_empty()
                    {
                        row.insert(lang.name().to_string(), String::new());
                        stats.fields_cleared += 1;
                    }
                    if matches && row_is_empty(&row, &other_langs) {
                        stats.rows_removed += 1;
                    } else {
                        remaining.push(row);
                    }
                }
                table.rows = remaining;
                table.write(root)?;
            }
        }
    }

    info!(
        "clear-all: {} rows removed, {} fields cleared, {} chunk files removed",
        stats.rows_removed, stats.fields_cleared, stats.chunk_files_removed
    );
    Ok(stats)
}

/// Keyword mode: drop exactly the rows whose source blob contains the
/// keyword (case-sensitive), deleting every blob those rows reference.
fn clear_by_keyword(
    root: &Path,
    source_lang: Lang,
    keyword: &str,
    table: Option<Table>,
    stats: &mut ClearAllStats,
) -> Result<(), Error> {
    let Some(mut table) = table else {
        return Ok(());
    };
    let lang_fields = table.language_fields();
    let mut remaining = Vec::new();
    for row in table.rows.drain(..) {
        let path_hash = row
            .get(PATH_CHECKSUM_COLUMN)
            .cloned()
            .unwrap_or_default();
        let src_checksum = row.get(source_lang.name()).cloned().unwrap_or_default();
        let contents = if src_checksum.is_empty() {
            None
        } else {
            super::backend::read_blob(root, &src_checksum, source_lang, &path_hash)?
        };
        let matches = contents
            .map(|c| c.contains(keyword))
            .unwrap_or(false);
        if !matches {
            remaining.push(row);
            continue;
        }

        for field in &lang_fields {
            let digest = row.get(field).map(String::as_str).unwrap_or("");
            if digest.is_empty() {
                continue;
            }
            let blob = cache_dir(root).join(field).join(&path_hash).join(digest);
            if blob.is_file() {
                fs::remove_file(&blob)?;
                stats.chunk_files_removed += 1;
            } else {
                warn!("blob {:?} already missing while clearing by keyword", blob);
            }
        }
        stats.rows_removed += 1;
    }
    table.rows = remaining;
    table.write(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{CsvStore, TranslationStore};
    use crate::checksum::checksum;
    use tempfile::tempdir;

    fn seed(root: &Path) -> (String, String) {
        let store = CsvStore::new(root);
        store
            .persist_pair("Hello", "Bonjour", Lang::English, Lang::French, "doc.md")
            .unwrap();
        (checksum("Hello"), checksum("Bonjour"))
    }

    #[test]
    fn missing_target_cell_is_cleared_but_row_survives() {
        let root = tempdir().unwrap();
        let (src, _) = seed(root.path());

        // add a German correspondent whose blob we then delete
        let store = CsvStore::new(root.path());
        store
            .persist_pair("Hello", "Hallo", Lang::English, Lang::German, "doc.md")
            .unwrap();
        let path_hash = path_checksum("doc.md");
        let de_blob = cache_dir(root.path())
            .join("German")
            .join(&path_hash)
            .join(checksum("Hallo"));
        fs::remove_file(de_blob).unwrap();

        let stats = clear_missing_chunks(root.path(), Lang::English).unwrap();
        assert_eq!(
            stats,
            ClearMissingStats {
                rows_removed: 0,
                fields_cleared: 1,
                source_chunks_removed: 0,
            }
        );

        let table = Table::read(root.path()).unwrap().unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("German").unwrap(), "");
        assert_eq!(table.rows[0].get("English").unwrap(), &src);
        assert_eq!(table.rows[0].get("French").unwrap(), &checksum("Bonjour"));
    }

    #[test]
    fn row_without_targets_is_dropped_with_its_source_blob() {
        let root = tempdir().unwrap();
        let (_, tgt) = seed(root.path());
        let path_hash = path_checksum("doc.md");
        let fr_blob = cache_dir(root.path())
            .join("French")
            .join(&path_hash)
            .join(&tgt);
        fs::remove_file(fr_blob).unwrap();

        let stats = clear_missing_chunks(root.path(), Lang::English).unwrap();
        assert_eq!(stats.rows_removed, 1);
        assert_eq!(stats.source_chunks_removed, 1);

        let table = Table::read(root.path()).unwrap().unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn missing_source_blob_drops_row_but_keeps_targets() {
        let root = tempdir().unwrap();
        let (src, tgt) = seed(root.path());
        let path_hash = path_checksum("doc.md");
        fs::remove_file(
            cache_dir(root.path())
                .join("English")
                .join(&path_hash)
                .join(&src),
        )
        .unwrap();

        let stats = clear_missing_chunks(root.path(), Lang::English).unwrap();
        assert_eq!(stats.rows_removed, 1);
        assert!(cache_dir(root.path())
            .join("French")
            .join(&path_hash)
            .join(&tgt)
            .is_file());
    }

    #[test]
    fn after_clearing_no_row_cites_missing_blobs() {
        let root = tempdir().unwrap();
        seed(root.path());
        clear_missing_chunks(root.path(), Lang::English).unwrap();

        let table = Table::read(root.path()).unwrap().unwrap();
        for row in &table.rows {
            let path_hash = row.get(PATH_CHECKSUM_COLUMN).unwrap();
            for field in table.language_fields() {
                let digest = row.get(&field).unwrap();
                if !digest.is_empty() {
                    assert!(blob_exists(root.path(), digest, &field, path_hash));
                }
            }
        }
    }

    #[test]
    fn clear_all_wipes_everything() {
        let root = tempdir().unwrap();
        seed(root.path());
        let stats = clear_all(root.path(), Lang::English, None, None, None).unwrap();
        assert_eq!(stats.rows_removed, 1);
        assert_eq!(stats.chunk_files_removed, 2);
        assert!(Table::read(root.path()).unwrap().unwrap().rows.is_empty());
    }

    #[test]
    fn clear_lang_only_clears_the_column() {
        let root = tempdir().unwrap();
        seed(root.path());
        let store = CsvStore::new(root.path());
        store
            .persist_pair("Hello", "Hallo", Lang::English, Lang::German, "doc.md")
            .unwrap();

        let stats = clear_all(root.path(), Lang::English, Some(Lang::German), None, None).unwrap();
        assert_eq!(stats.fields_cleared, 1);
        assert_eq!(stats.rows_removed, 0);
        assert_eq!(stats.chunk_files_removed, 1);

        let table = Table::read(root.path()).unwrap().unwrap();
        assert_eq!(table.rows[0].get("German").unwrap(), "");
        assert_eq!(table.rows[0].get("French").unwrap(), &checksum("Bonjour"));
    }

    #[test]
    fn clear_path_only_drops_matching_rows() {
        let root = tempdir().unwrap();
        seed(root.path());
        let store = CsvStore::new(root.path());
        store
            .persist_pair("Other", "Autre", Lang::English, Lang::French, "other.md")
            .unwrap();

        let stats = clear_all(root.path(), Lang::English, None, Some("doc.md"), None).unwrap();
        assert_eq!(stats.rows_removed, 1);
        assert_eq!(stats.chunk_files_removed, 2);

        let table = Table::read(root.path()).unwrap().unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0].get(PATH_CHECKSUM_COLUMN).unwrap(),
            &path_checksum("other.md")
        );
    }

    #[test]
    fn clear_lang_and_path_clears_one_cell() {
        let root = tempdir().unwrap();
        seed(root.path());
        let store = CsvStore::new(root.path());
        store
            .persist_pair("Other", "Autre", Lang::English, Lang::French, "other.md")
            .unwrap();

        let stats = clear_all(
            root.path(),
            Lang::English,
            Some(Lang::French),
            Some("doc.md"),
            None,
        )
        .unwrap();
        assert_eq!(stats.fields_cleared, 1);
        // the source cell keeps the row alive
        assert_eq!(stats.rows_removed, 0);
        assert_eq!(stats.chunk_files_removed, 1);

        let table = Table::read(root.path()).unwrap().unwrap();
        assert_eq!(table.rows.len(), 2);
        let doc_hash = path_checksum("doc.md");
        let other_hash = path_checksum("other.md");
        let doc_row = table
            .rows
            .iter()
            .find(|r| r.get(PATH_CHECKSUM_COLUMN).map(String::as_str) == Some(doc_hash.as_str()))
            .unwrap();
        assert_eq!(doc_row.get("French").unwrap(), "");
        let other_row = table
            .rows
            .iter()
            .find(|r| r.get(PATH_CHECKSUM_COLUMN).map(String::as_str) == Some(other_hash.as_str()))
            .unwrap();
        assert_eq!(other_row.get("French").unwrap(), &checksum("Autre"));
    }

    #[test]
    fn keyword_restricts_all_mode() {
        let root = tempdir().unwrap();
        let store = CsvStore::new(root.path());
        store
            .persist_pair("Hello world", "Bonjour", Lang::English, Lang::French, "a.md")
            .unwrap();
        store
            .persist_pair("Nothing here", "Rien ici", Lang::English, Lang::French, "a.md")
            .unwrap();

        let stats = clear_all(root.path(), Lang::English, None, None, Some("world")).unwrap();
        assert_eq!(stats.rows_removed, 1);
        assert_eq!(stats.chunk_files_removed, 2);

        let table = Table::read(root.path()).unwrap().unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0].get("English").unwrap(),
            &checksum("Nothing here")
        );
    }

    #[test]
    fn keyword_with_selector_is_rejected() {
        let root = tempdir().unwrap();
        seed(root.path());
        assert!(clear_all(
            root.path(),
            Lang::English,
            Some(Lang::French),
            None,
            Some("x")
        )
        .is_err());
    }
}
