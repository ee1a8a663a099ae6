/*! Corrector: ingest hand-edited translations.

After a human fixes a translated file, each chunk still carries the
`src_checksum` of the source it was produced from. For every chunk whose
current text no longer corresponds to the cached pair, the edited text
becomes the new translation. Chunks whose checksum is unknown to the cache
are reported and skipped; a later translation run will redo them.
!*/
use std::path::Path;

use log::{debug, warn};

use crate::cache::store::{CsvStore, TranslationStore};
use crate::chunking::{analyze_document_type, DocumentType};
use crate::error::Error;
use crate::lang::Lang;
use crate::pipelines::{latex, myst, notebook, KEY_SRC_CHECKSUM};

/// Ingest corrections from one translated file. Returns true when at least
/// one pair was updated.
pub fn correct_file(
    root: &Path,
    target_path: &Path,
    src_lang: Lang,
    tgt_lang: Lang,
    relative_path: &str,
) -> Result<bool, Error> {
    let doc_type = analyze_document_type(target_path);
    let chunks: Vec<(String, String)> = match doc_type {
        DocumentType::JupyterNotebook
            if target_path.extension().and_then(|e| e.to_str()) == Some("ipynb") =>
        {
            notebook::cells_with_checksums(target_path)?
        }
        DocumentType::JupyterNotebook | DocumentType::Markdown => {
            myst::read_chunks_with_metadata(target_path)?
                .into_iter()
                .filter_map(|c| {
                    c.metadata
                        .get(KEY_SRC_CHECKSUM)
                        .map(|d| (d.to_string(), c.source))
                })
                .collect()
        }
        DocumentType::LaTeX => latex::read_chunks_with_metadata(target_path)?
            .into_iter()
            .filter_map(|c| {
                c.metadata
                    .get(KEY_SRC_CHECKSUM)
                    .map(|d| (d.to_string(), c.source))
            })
            .collect(),
        DocumentType::Other => {
            return Err(Error::FileNotTranslatable(target_path.to_path_buf()));
        }
    };

    let store = CsvStore::new(root);
    let mut changed = false;
    for (src_checksum, tgt_text) in chunks {
        changed |= correct_chunk(
            &store,
            &src_checksum,
            &tgt_text,
            src_lang,
            tgt_lang,
            relative_path,
        )?;
    }
    Ok(changed)
}

fn correct_chunk(
    store: &CsvStore,
    src_checksum: &str,
    tgt_text: &str,
    src_lang: Lang,
    tgt_lang: Lang,
    relative_path: &str,
) -> Result<bool, Error> {
    let Some(src_text) = store.contents_by_checksum(src_checksum, src_lang, relative_path)?
    else {
        warn!(
            "source checksum {} not found in the cache, skipping correction",
            src_checksum
        );
        return Ok(false);
    };

    if store.translation_corresponds(src_checksum, src_lang, tgt_text, tgt_lang, relative_path)? {
        return Ok(false);
    }

    debug!("correcting pair for source {}", src_checksum);
    store.persist_pair(&src_text, tgt_text, src_lang, tgt_lang, relative_path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::{CsvStore, TranslationStore};
    use crate::checksum::checksum;
    use crate::pipelines::{Cell, KEY_NEEDS_REVIEW};
    use tempfile::tempdir;

    #[test]
    fn hand_edit_replaces_the_cached_pair() {
        let root = tempdir().unwrap();
        let store = CsvStore::new(root.path());
        store
            .persist_pair("Hello", "Bonjour", Lang::English, Lang::French, "doc.md")
            .unwrap();

        // the user rewrites the translation in the target file
        let mut cell = Cell::new("Salut");
        cell.metadata.set(KEY_SRC_CHECKSUM, checksum("Hello"));
        cell.metadata.set(KEY_NEEDS_REVIEW, "True");
        let target = root.path().join("doc_fr.md");
        std::fs::write(&target, myst::compile_cells(&[cell])).unwrap();

        let changed =
            correct_file(root.path(), &target, Lang::English, Lang::French, "doc.md").unwrap();
        assert!(changed);

        let cached = store
            .lookup(&checksum("Hello"), Lang::English, Lang::French, "doc.md")
            .unwrap();
        assert_eq!(cached, Some("Salut".to_string()));
    }

    #[test]
    fn matching_translation_is_left_alone() {
        let root = tempdir().unwrap();
        let store = CsvStore::new(root.path());
        store
            .persist_pair("Hello", "Bonjour", Lang::English, Lang::French, "doc.md")
            .unwrap();

        let mut cell = Cell::new("Bonjour");
        cell.metadata.set(KEY_SRC_CHECKSUM, checksum("Hello"));
        let target = root.path().join("doc_fr.md");
        std::fs::write(&target, myst::compile_cells(&[cell])).unwrap();

        let changed =
            correct_file(root.path(), &target, Lang::English, Lang::French, "doc.md").unwrap();
        assert!(!changed);
    }

    #[test]
    fn unknown_checksum_is_skipped() {
        let root = tempdir().unwrap();

        let mut cell = Cell::new("Texte orphelin");
        cell.metadata.set(KEY_SRC_CHECKSUM, checksum("Never cached"));
        let target = root.path().join("doc_fr.md");
        std::fs::write(&target, myst::compile_cells(&[cell])).unwrap();

        let changed =
            correct_file(root.path(), &target, Lang::English, Lang::French, "doc.md").unwrap();
        assert!(!changed);
    }
}
