/*! Cache rebuilder.

Reconstructs cache entries from a source file and its translated twin
without calling the model. The source is re-chunked and keyed by checksum;
the target's chunks carry `src_checksum` metadata from the translator's
prior run, so each one that still matches yields a recovered pair. Chunks
whose checksum no longer appears in the source are skipped with a warning:
the source drifted since the translation was produced.
!*/
use std::collections::HashMap;
use std::path::Path;

use log::{info, warn};

use crate::cache::store::{CsvStore, TranslationStore};
use crate::checksum::checksum;
use crate::chunking::{analyze_document_type, DocumentType};
use crate::error::Error;
use crate::lang::Lang;
use crate::pipelines::{latex, myst, notebook, KEY_SRC_CHECKSUM};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredPair {
    pub src_checksum: String,
    pub src_text: String,
    pub tgt_text: String,
}

/// Build the recoverable pairs for one (source, target) file couple.
pub fn collect_translation_pairs(
    source_path: &Path,
    target_path: &Path,
    doc_type: DocumentType,
) -> Result<Vec<RecoveredPair>, Error> {
    if doc_type == DocumentType::Other {
        warn!(
            "skipping {:?}: this document type embeds no metadata, cannot rebuild",
            target_path
        );
        return Ok(Vec::new());
    }

    let src_chunks = source_chunk_map(source_path, doc_type)?;
    if src_chunks.is_empty() {
        warn!("no chunks detected in {:?}, skipping rebuild", source_path);
        return Ok(Vec::new());
    }

    let mut recovered = Vec::new();
    for (digest, tgt_text) in target_chunks(target_path, doc_type)? {
        let Some(src_text) = src_chunks.get(&digest) else {
            warn!(
                "target chunk in {:?} references missing checksum {}; source file may have changed",
                target_path, digest
            );
            continue;
        };
        recovered.push(RecoveredPair {
            src_checksum: digest,
            src_text: src_text.clone(),
            tgt_text,
        });
    }
    Ok(recovered)
}

/// `checksum(src_text) → src_text`, first occurrence wins.
fn source_chunk_map(
    source_path: &Path,
    doc_type: DocumentType,
) -> Result<HashMap<String, String>, Error> {
    let sources: Vec<String> = match doc_type {
        DocumentType::JupyterNotebook
            if source_path.extension().and_then(|e| e.to_str()) == Some("ipynb") =>
        {
            notebook::cell_sources(source_path)?
        }
        DocumentType::JupyterNotebook | DocumentType::Markdown => {
            myst::file_to_cells(source_path)?
                .into_iter()
                .map(|c| c.source)
                .collect()
        }
        DocumentType::LaTeX => latex::file_to_cells(source_path)?
            .into_iter()
            .map(|c| c.source)
            .collect(),
        DocumentType::Other => Vec::new(),
    };

    let mut map = HashMap::new();
    for text in sources {
        map.entry(checksum(&text)).or_insert(text);
    }
    Ok(map)
}

fn target_chunks(
    target_path: &Path,
    doc_type: DocumentType,
) -> Result<Vec<(String, String)>, Error> {
    match doc_type {
        DocumentType::JupyterNotebook
            if target_path.extension().and_then(|e| e.to_str()) == Some("ipynb") =>
        {
            notebook::cells_with_checksums(target_path)
        }
        DocumentType::JupyterNotebook | DocumentType::Markdown => {
            Ok(extract_fenced(myst::read_chunks_with_metadata(target_path)?))
        }
        DocumentType::LaTeX => Ok(extract_fenced(latex::read_chunks_with_metadata(
            target_path,
        )?)),
        DocumentType::Other => Ok(Vec::new()),
    }
}

fn extract_fenced(cells: Vec<crate::pipelines::Cell>) -> Vec<(String, String)> {
    cells
        .into_iter()
        .filter_map(|cell| {
            cell.metadata
                .get(KEY_SRC_CHECKSUM)
                .map(|digest| (digest.to_string(), cell.source))
        })
        .collect()
}

/// Rebuild the cache for one file pair; returns how many pairs were
/// persisted. Idempotent: blobs are content-addressed and rows are keyed by
/// `(path_hash, src_checksum)`.
pub fn rebuild_file_cache(
    root: &Path,
    source_path: &Path,
    target_path: &Path,
    relative_path: &str,
    src_lang: Lang,
    tgt_lang: Lang,
) -> Result<usize, Error> {
    let doc_type = analyze_document_type(source_path);
    let pairs = collect_translation_pairs(source_path, target_path, doc_type)?;
    let store = CsvStore::new(root);

    let count = pairs.len();
    for pair in pairs {
        store.persist_pair(
            &pair.src_text,
            &pair.tgt_text,
            src_lang,
            tgt_lang,
            relative_path,
        )?;
    }
    info!(
        "rebuilt {} pairs for {:?} -> {:?}",
        count, source_path, target_path
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{CsvStore, TranslationStore};
    use serde_json::json;
    use tempfile::tempdir;

    fn write_notebook(path: &Path, cells: Vec<serde_json::Value>) {
        let nb = json!({
            "cells": cells,
            "metadata": {},
            "nbformat": 4,
            "nbformat_minor": 5,
        });
        std::fs::write(path, serde_json::to_string_pretty(&nb).unwrap()).unwrap();
    }

    #[test]
    fn rebuild_recovers_pairs_without_model() {
        let root = tempdir().unwrap();
        let src_path = root.path().join("nb.ipynb");
        let tgt_path = root.path().join("nb_fr.ipynb");

        write_notebook(
            &src_path,
            vec![
                json!({"cell_type": "markdown", "metadata": {}, "source": "Alpha"}),
                json!({"cell_type": "markdown", "metadata": {}, "source": "Beta"}),
            ],
        );
        write_notebook(
            &tgt_path,
            vec![
                json!({
                    "cell_type": "markdown",
                    "metadata": {"src_checksum": checksum("Alpha")},
                    "source": "Alpha traduit"
                }),
                json!({
                    "cell_type": "markdown",
                    "metadata": {"src_checksum": checksum("Beta")},
                    "source": "Beta traduit"
                }),
            ],
        );

        let count = rebuild_file_cache(
            root.path(),
            &src_path,
            &tgt_path,
            "nb.ipynb",
            Lang::English,
            Lang::French,
        )
        .unwrap();
        assert_eq!(count, 2);

        let store = CsvStore::new(root.path());
        let cached = store
            .lookup(&checksum("Alpha"), Lang::English, Lang::French, "nb.ipynb")
            .unwrap();
        assert_eq!(cached, Some("Alpha traduit".to_string()));
        let cached = store
            .lookup(&checksum("Beta"), Lang::English, Lang::French, "nb.ipynb")
            .unwrap();
        assert_eq!(cached, Some("Beta traduit".to_string()));
    }

    #[test]
    fn drifted_source_chunks_are_skipped() {
        let root = tempdir().unwrap();
        let src_path = root.path().join("nb.ipynb");
        let tgt_path = root.path().join("nb_fr.ipynb");

        write_notebook(
            &src_path,
            vec![json!({"cell_type": "markdown", "metadata": {}, "source": "Alpha edited"})],
        );
        write_notebook(
            &tgt_path,
            vec![json!({
                "cell_type": "markdown",
                "metadata": {"src_checksum": checksum("Alpha")},
                "source": "Alpha traduit"
            })],
        );

        let pairs = collect_translation_pairs(
            &src_path,
            &tgt_path,
            DocumentType::JupyterNotebook,
        )
        .unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn rebuild_is_idempotent() {
        let root = tempdir().unwrap();
        let src_path = root.path().join("nb.ipynb");
        let tgt_path = root.path().join("nb_fr.ipynb");

        write_notebook(
            &src_path,
            vec![json!({"cell_type": "markdown", "metadata": {}, "source": "Alpha"})],
        );
        write_notebook(
            &tgt_path,
            vec![json!({
                "cell_type": "markdown",
                "metadata": {"src_checksum": checksum("Alpha")},
                "source": "Alpha traduit"
            })],
        );

        for _ in 0..2 {
            rebuild_file_cache(
                root.path(),
                &src_path,
                &tgt_path,
                "nb.ipynb",
                Lang::English,
                Lang::French,
            )
            .unwrap();
        }

        let table = crate::cache::correspondence::Table::read(root.path())
            .unwrap()
            .unwrap();
        assert_eq!(table.rows.len(), 1);
    }
}
