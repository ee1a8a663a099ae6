//! Custom vocabulary lists.
//!
//! A CSV whose header row names languages; each record holds one term in
//! every language. The `(source, target)` projection compiles to the
//! `SRC=TGT` lines the prompts expect in `[CUSTOM_VOCABULARY]`.
use std::path::Path;

use itertools::Itertools;
use log::warn;

use crate::error::Error;
use crate::lang::Lang;

#[derive(Debug, Clone, Default)]
pub struct VocabList {
    entries: Vec<(String, String)>,
}

impl VocabList {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `SRC=TGT` lines for the prompt. A term listed as `TERM=TERM` tells
    /// the model to keep it untranslated.
    pub fn compile(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        self.entries
            .iter()
            .map(|(src, tgt)| format!("{}={}", src, tgt))
            .join("\n")
            + "\n"
    }

    /// Project the `(src_lang, tgt_lang)` columns out of a vocabulary CSV.
    pub fn from_csv(path: &Path, src_lang: Lang, tgt_lang: Lang) -> Result<Self, Error> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let src_col = headers.iter().position(|h| h == src_lang.name());
        let tgt_col = headers.iter().position(|h| h == tgt_lang.name());
        let (Some(src_col), Some(tgt_col)) = (src_col, tgt_col) else {
            warn!(
                "vocabulary {:?} lacks a {} or {} column",
                path, src_lang, tgt_lang
            );
            return Ok(Self::default());
        };

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record?;
            let src = record.get(src_col).unwrap_or_default();
            let tgt = record.get(tgt_col).unwrap_or_default();
            if !src.is_empty() && !tgt.is_empty() {
                entries.push((src.to_string(), tgt.to_string()));
            }
        }
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn compile_emits_one_pair_per_line() {
        let vocab = VocabList::new(vec![
            ("monoid".to_string(), "monoïde".to_string()),
            ("laptop".to_string(), "laptop".to_string()),
        ]);
        assert_eq!(vocab.compile(), "monoid=monoïde\nlaptop=laptop\n");
    }

    #[test]
    fn from_csv_projects_language_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "English,French,German").unwrap();
        writeln!(f, "ring,anneau,Ring").unwrap();
        writeln!(f, "field,corps,Körper").unwrap();

        let vocab = VocabList::from_csv(&path, Lang::English, Lang::French).unwrap();
        assert_eq!(vocab.compile(), "ring=anneau\nfield=corps\n");

        let missing = VocabList::from_csv(&path, Lang::English, Lang::Ukrainian).unwrap();
        assert!(missing.is_empty());
    }
}
