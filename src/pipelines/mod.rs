/*! Per-document-type translation pipelines.

Each pipeline splits a source file into chunks, feeds them to the
orchestrator strictly in document order, and assembles the target file with
per-chunk metadata (`src_checksum`, `needs_review`) embedded in comment
fences or notebook cell metadata. A chunk that fails to translate keeps its
source text and gains a `not-translated-due-to-exception` marker instead of
aborting the file.
!*/
use std::path::Path;

use crate::chunking::{analyze_document_type, DocumentType};
use crate::error::Error;
use crate::lang::Lang;
use crate::translate::chunk_translator::RetryPolicy;
use crate::translate::model::ModelCaller;
use crate::vocab::VocabList;

pub mod latex;
pub mod myst;
pub mod notebook;
pub mod plain;

pub const KEY_SRC_CHECKSUM: &str = "src_checksum";
pub const KEY_NEEDS_REVIEW: &str = "needs_review";
pub const KEY_NOT_TRANSLATED: &str = "not-translated-due-to-exception";

/// Ordered key/value metadata attached to one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellMeta {
    entries: Vec<(String, String)>,
}

impl CellMeta {
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One chunk of a file on its way through a pipeline.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub source: String,
    pub metadata: CellMeta,
}

impl Cell {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            metadata: CellMeta::default(),
        }
    }
}

/// Everything a pipeline needs besides the two file paths.
pub struct TranslateContext<'a> {
    pub root: &'a Path,
    pub src_lang: Lang,
    pub tgt_lang: Lang,
    pub relative_path: String,
    pub vocab: Option<VocabList>,
    pub caller: Option<&'a dyn ModelCaller>,
    pub project_description: String,
    pub retry: RetryPolicy,
}

/// Translate one file, dispatching on its detected document type.
///
/// Jupytext-flavored markdown goes through the MyST pipeline: its cells are
/// MyST blocks either way, and the comment-fence metadata grammar works for
/// any text file.
pub async fn translate_file(
    ctx: &TranslateContext<'_>,
    source_path: &Path,
    target_path: &Path,
) -> Result<(), Error> {
    let doc_type = analyze_document_type(source_path);
    match doc_type {
        DocumentType::LaTeX => latex::translate_file(ctx, source_path, target_path).await,
        DocumentType::JupyterNotebook => {
            if source_path.extension().and_then(|e| e.to_str()) == Some("ipynb") {
                notebook::translate_file(ctx, source_path, target_path).await
            } else {
                myst::translate_file(ctx, source_path, target_path).await
            }
        }
        DocumentType::Markdown => myst::translate_file(ctx, source_path, target_path).await,
        DocumentType::Other => plain::translate_file(ctx, source_path, target_path).await,
    }
}

/// Parse the `% key: value` lines of a metadata fence body.
pub(crate) fn parse_metadata_lines(block: &str) -> CellMeta {
    let mut meta = CellMeta::default();
    for line in block.lines() {
        let line = line.trim();
        let line = line.strip_prefix("<!--").map(str::trim).unwrap_or(line);
        let Some(line) = line.strip_prefix('%') else {
            continue;
        };
        let line = line.trim();
        if line.starts_with("--- CHUNK_METADATA_START ---")
            || line.starts_with("--- CHUNK_METADATA_END ---")
        {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            meta.set(key.trim(), value.trim().to_string());
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_meta_preserves_insertion_order() {
        let mut meta = CellMeta::default();
        meta.set(KEY_SRC_CHECKSUM, "abc");
        meta.set(KEY_NEEDS_REVIEW, "True");
        meta.set(KEY_SRC_CHECKSUM, "def");

        let entries: Vec<(&str, &str)> = meta.iter().collect();
        assert_eq!(
            entries,
            vec![(KEY_SRC_CHECKSUM, "def"), (KEY_NEEDS_REVIEW, "True")]
        );
    }

    #[test]
    fn metadata_lines_parse_keys_and_values() {
        let block = "% --- CHUNK_METADATA_START ---\n% src_checksum: abc123\n% needs_review: True\n% --- CHUNK_METADATA_END ---\n";
        let meta = parse_metadata_lines(block);
        assert_eq!(meta.get(KEY_SRC_CHECKSUM), Some("abc123"));
        assert_eq!(meta.get(KEY_NEEDS_REVIEW), Some("True"));
    }
}
