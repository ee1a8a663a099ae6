/*! Correspondence table.

A wide CSV keyed by `path_checksum`, one column per language, each non-empty
cell holding the checksum of that language's rendering of one chunk. The
schema evolves monotonically: adding a language appends a column with empty
cells for pre-existing rows; removing one drops the column. Any language
column can act as the "source" of a query.
!*/
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::lang::Lang;

use super::{backend::ensure_cache_dir, CORRESPONDENCE_FILENAME, PATH_CHECKSUM_COLUMN};

pub fn correspondence_file(root: &Path) -> PathBuf {
    super::cache_dir(root).join(CORRESPONDENCE_FILENAME)
}

/// In-memory image of the table; mutations rewrite the file whole.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub fields: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl Table {
    fn ensure_path_field(&mut self) {
        if !self.fields.iter().any(|f| f == PATH_CHECKSUM_COLUMN) {
            self.fields.insert(0, PATH_CHECKSUM_COLUMN.to_string());
        }
    }

    pub fn has_language(&self, lang: Lang) -> bool {
        self.fields.iter().any(|f| f == lang.name())
    }

    pub fn add_language(&mut self, lang: Lang) {
        self.ensure_path_field();
        if self.has_language(lang) {
            return;
        }
        self.fields.push(lang.name().to_string());
        for row in &mut self.rows {
            row.insert(lang.name().to_string(), String::new());
        }
    }

    pub fn remove_language(&mut self, lang: Lang) {
        self.ensure_path_field();
        self.fields.retain(|f| f != lang.name());
        for row in &mut self.rows {
            row.remove(lang.name());
        }
    }

    /// Language columns, i.e. everything but the path key.
    pub fn language_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.as_str() != PATH_CHECKSUM_COLUMN)
            .cloned()
            .collect()
    }

    /// Read the table; `None` when the file does not exist yet.
    pub fn read(root: &Path) -> Result<Option<Table>, Error> {
        let file = correspondence_file(root);
        if !file.exists() {
            return Ok(None);
        }
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&file)?;
        let headers = reader
            .headers()
            .map_err(|e| Error::CacheCorrupt(format!("correspondence header: {}", e)))?
            .clone();
        let mut table = Table {
            fields: headers.iter().map(str::to_string).collect(),
            rows: Vec::new(),
        };
        table.ensure_path_field();

        for record in reader.records() {
            let record =
                record.map_err(|e| Error::CacheCorrupt(format!("correspondence row: {}", e)))?;
            let mut row = HashMap::new();
            for (i, field) in headers.iter().enumerate() {
                row.insert(
                    field.to_string(),
                    record.get(i).unwrap_or_default().to_string(),
                );
            }
            row.entry(PATH_CHECKSUM_COLUMN.to_string()).or_default();
            table.rows.push(row);
        }
        Ok(Some(table))
    }

    /// Rewrite the whole table. Missing cells serialize as empty strings.
    pub fn write(&mut self, root: &Path) -> Result<(), Error> {
        ensure_cache_dir(root)?;
        self.ensure_path_field();
        let mut writer = csv::Writer::from_path(correspondence_file(root))?;
        writer.write_record(&self.fields)?;
        for row in &self.rows {
            let record: Vec<&str> = self
                .fields
                .iter()
                .map(|f| row.get(f).map(String::as_str).unwrap_or(""))
                .collect();
            writer.write_record(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn ensure(root: &Path) -> Result<(), Error> {
        if !correspondence_file(root).exists() {
            Table::default().write(root)?;
        }
        Ok(())
    }
}

/// Row lookup restricted to the matching path hash. Legacy rows with an
/// empty path cell match any query path.
pub fn find_correspondent(
    root: &Path,
    src_checksum: &str,
    src_lang: Lang,
    tgt_lang: Lang,
    path_hash: &str,
) -> Result<Option<String>, Error> {
    if src_lang == tgt_lang {
        return Ok(None);
    }
    let Some(table) = Table::read(root)? else {
        Table::ensure(root)?;
        return Ok(None);
    };
    if !table.has_language(src_lang) || !table.has_language(tgt_lang) {
        return Ok(None);
    }

    for row in &table.rows {
        let row_path = row
            .get(PATH_CHECKSUM_COLUMN)
            .map(String::as_str)
            .unwrap_or("");
        if !row_path.is_empty() && row_path != path_hash {
            continue;
        }
        if row.get(src_lang.name()).map(String::as_str) == Some(src_checksum) {
            let tgt = row.get(tgt_lang.name()).map(String::as_str).unwrap_or("");
            return Ok((!tgt.is_empty()).then(|| tgt.to_string()));
        }
    }
    Ok(None)
}

/// Locate the row with matching `(path_hash, src column)` and set the target
/// cell, appending a new row when absent. Missing language columns are added
/// to the schema on the fly.
pub fn set_pair(
    root: &Path,
    src_checksum: &str,
    src_lang: Lang,
    tgt_checksum: &str,
    tgt_lang: Lang,
    path_hash: &str,
) -> Result<(), Error> {
    if src_lang == tgt_lang {
        return Ok(());
    }
    let mut table = Table::read(root)?.unwrap_or_default();
    table.add_language(src_lang);
    table.add_language(tgt_lang);

    for row in &mut table.rows {
        let row_path = row
            .get(PATH_CHECKSUM_COLUMN)
            .map(String::as_str)
            .unwrap_or("");
        if !row_path.is_empty() && row_path != path_hash {
            continue;
        }
        if row.get(src_lang.name()).map(String::as_str) == Some(src_checksum) {
            row.insert(PATH_CHECKSUM_COLUMN.to_string(), path_hash.to_string());
            row.insert(tgt_lang.name().to_string(), tgt_checksum.to_string());
            return table.write(root);
        }
    }

    let mut row: HashMap<String, String> = table
        .fields
        .iter()
        .map(|f| (f.clone(), String::new()))
        .collect();
    row.insert(PATH_CHECKSUM_COLUMN.to_string(), path_hash.to_string());
    row.insert(src_lang.name().to_string(), src_checksum.to_string());
    row.insert(tgt_lang.name().to_string(), tgt_checksum.to_string());
    table.rows.push(row);
    table.write(root)
}

pub fn add_language(root: &Path, lang: Lang) -> Result<(), Error> {
    let mut table = Table::read(root)?.unwrap_or_default();
    table.add_language(lang);
    table.write(root)
}

pub fn remove_language(root: &Path, lang: Lang) -> Result<(), Error> {
    let Some(mut table) = Table::read(root)? else {
        return Table::ensure(root);
    };
    table.remove_language(lang);
    table.write(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_then_find_pair() {
        let root = tempdir().unwrap();
        set_pair(root.path(), "aaa", Lang::English, "bbb", Lang::French, "p1").unwrap();

        assert_eq!(
            find_correspondent(root.path(), "aaa", Lang::English, Lang::French, "p1").unwrap(),
            Some("bbb".to_string())
        );
        // any column can act as source
        assert_eq!(
            find_correspondent(root.path(), "bbb", Lang::French, Lang::English, "p1").unwrap(),
            Some("aaa".to_string())
        );
        assert_eq!(
            find_correspondent(root.path(), "ccc", Lang::French, Lang::English, "p1").unwrap(),
            None
        );
    }

    #[test]
    fn lookup_is_scoped_by_path_hash() {
        let root = tempdir().unwrap();
        set_pair(root.path(), "aaa", Lang::English, "bbb", Lang::French, "p1").unwrap();
        assert_eq!(
            find_correspondent(root.path(), "aaa", Lang::English, Lang::French, "p2").unwrap(),
            None
        );
    }

    #[test]
    fn one_row_per_path_and_source_checksum() {
        let root = tempdir().unwrap();
        set_pair(root.path(), "aaa", Lang::English, "bbb", Lang::French, "p1").unwrap();
        set_pair(root.path(), "aaa", Lang::English, "ccc", Lang::German, "p1").unwrap();

        let table = Table::read(root.path()).unwrap().unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("French").unwrap(), "bbb");
        assert_eq!(table.rows[0].get("German").unwrap(), "ccc");
    }

    #[test]
    fn adding_a_language_backfills_empty_cells() {
        let root = tempdir().unwrap();
        set_pair(root.path(), "aaa", Lang::English, "bbb", Lang::French, "p1").unwrap();
        add_language(root.path(), Lang::Ukrainian).unwrap();

        let table = Table::read(root.path()).unwrap().unwrap();
        assert!(table.fields.iter().any(|f| f == "Ukrainian"));
        assert_eq!(table.rows[0].get("Ukrainian").unwrap(), "");
    }

    #[test]
    fn removing_a_language_drops_the_column() {
        let root = tempdir().unwrap();
        set_pair(root.path(), "aaa", Lang::English, "bbb", Lang::French, "p1").unwrap();
        remove_language(root.path(), Lang::French).unwrap();

        let table = Table::read(root.path()).unwrap().unwrap();
        assert!(!table.fields.iter().any(|f| f == "French"));
        assert_eq!(
            find_correspondent(root.path(), "aaa", Lang::English, Lang::French, "p1").unwrap(),
            None
        );
    }

    #[test]
    fn same_language_pair_is_rejected() {
        let root = tempdir().unwrap();
        set_pair(root.path(), "aaa", Lang::English, "bbb", Lang::English, "p1").unwrap();
        assert_eq!(
            find_correspondent(root.path(), "aaa", Lang::English, Lang::English, "p1").unwrap(),
            None
        );
    }
}
