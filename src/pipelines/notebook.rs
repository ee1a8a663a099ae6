//! Jupyter notebook (`.ipynb`) pipeline.
//!
//! The notebook is plain JSON: cells are translated in order, markdown cells
//! through the MyST strategy and code cells as identity (pass-through).
//! Every visited cell gains `src_checksum` metadata and a `needs_review`
//! tag; failed cells keep their source and are tagged
//! `not-translated-due-to-exception`. Unknown notebook fields ride along
//! untouched.
use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::cache::store::CsvStore;
use crate::checksum::checksum;
use crate::chunking::{ChunkType, DocumentType};
use crate::error::Error;
use crate::translate::chunk_translator::ChunkTranslator;
use crate::translate::Meta;

use super::{TranslateContext, KEY_NEEDS_REVIEW, KEY_NOT_TRANSLATED, KEY_SRC_CHECKSUM};

/// Join a cell source that may be a string or a list of line strings.
pub fn cell_source(cell: &Value) -> String {
    match cell.get("source") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .concat(),
        _ => String::new(),
    }
}

fn add_tag(metadata: &mut Value, tag: &str) {
    let tags = metadata
        .as_object_mut()
        .expect("cell metadata is an object")
        .entry("tags")
        .or_insert_with(|| json!([]));
    if let Value::Array(tags) = tags {
        if !tags.iter().any(|t| t.as_str() == Some(tag)) {
            tags.push(Value::String(tag.to_string()));
        }
    }
}

pub async fn translate_file(
    ctx: &TranslateContext<'_>,
    source_path: &Path,
    target_path: &Path,
) -> Result<(), Error> {
    let contents = fs::read_to_string(source_path)?;
    let mut notebook: Value = serde_json::from_str(&contents)
        .map_err(|e| Error::DocumentParse(format!("{:?}: {}", source_path, e)))?;

    let store = CsvStore::new(ctx.root);
    let translator = ChunkTranslator::new(&store, ctx.caller).with_retry(ctx.retry);

    let Some(cells) = notebook.get_mut("cells").and_then(Value::as_array_mut) else {
        return Err(Error::DocumentParse(format!(
            "{:?}: notebook without a cells array",
            source_path
        )));
    };

    for cell in cells.iter_mut() {
        translate_notebook_cell(ctx, &translator, cell).await?;
    }

    fs::write(target_path, serde_json::to_string_pretty(&notebook)?)?;
    Ok(())
}

async fn translate_notebook_cell(
    ctx: &TranslateContext<'_>,
    translator: &ChunkTranslator<'_>,
    cell: &mut Value,
) -> Result<(), Error> {
    let source = cell_source(cell);
    let cell_type = cell
        .get("cell_type")
        .and_then(Value::as_str)
        .unwrap_or("markdown")
        .to_string();

    if cell.get("metadata").map(|m| !m.is_object()).unwrap_or(true) {
        cell["metadata"] = json!({});
    }
    cell["metadata"][KEY_SRC_CHECKSUM] = Value::String(checksum(&source));
    add_tag(&mut cell["metadata"], KEY_NEEDS_REVIEW);

    let chunk_type = if cell_type == "code" {
        ChunkType::Code
    } else {
        ChunkType::MystBlock
    };

    let mut meta = Meta::new(
        source.clone(),
        ctx.src_lang,
        ctx.tgt_lang,
        DocumentType::JupyterNotebook,
        chunk_type,
        ctx.relative_path.clone(),
    );
    meta.vocab = ctx.vocab.clone();
    meta.project_description = ctx.project_description.clone();
    if chunk_type == ChunkType::Code {
        meta.prog_lang = Some("python".to_string());
    }

    match translator.translate_or_fetch(meta).await {
        Ok(translated) => {
            cell["source"] = Value::String(translated);
            Ok(())
        }
        Err(Error::ChunkTranslationFailed { text, cause }) => {
            log::error!("notebook cell left untranslated: {:?}", cause);
            add_tag(&mut cell["metadata"], KEY_NOT_TRANSLATED);
            cell["metadata"][KEY_NOT_TRANSLATED] = Value::String("True".to_string());
            cell["source"] = Value::String(text);
            Ok(())
        }
        Err(other) => Err(other),
    }
}

/// Iterate `(src_checksum, source_text)` of cells carrying the checksum
/// metadata, for the rebuilder and the corrector.
pub fn cells_with_checksums(path: &Path) -> Result<Vec<(String, String)>, Error> {
    let contents = fs::read_to_string(path)?;
    let notebook: Value = serde_json::from_str(&contents)
        .map_err(|e| Error::DocumentParse(format!("{:?}: {}", path, e)))?;

    let mut out = Vec::new();
    if let Some(cells) = notebook.get("cells").and_then(Value::as_array) {
        for cell in cells {
            let Some(digest) = cell
                .get("metadata")
                .and_then(|m| m.get(KEY_SRC_CHECKSUM))
                .and_then(Value::as_str)
            else {
                continue;
            };
            out.push((digest.to_string(), cell_source(cell)));
        }
    }
    Ok(out)
}

/// All cell sources of a notebook, in order.
pub fn cell_sources(path: &Path) -> Result<Vec<String>, Error> {
    let contents = fs::read_to_string(path)?;
    let notebook: Value = serde_json::from_str(&contents)
        .map_err(|e| Error::DocumentParse(format!("{:?}: {}", path, e)))?;
    Ok(notebook
        .get("cells")
        .and_then(Value::as_array)
        .map(|cells| cells.iter().map(cell_source).collect())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_source_joins_line_arrays() {
        let cell = json!({"source": ["line one\n", "line two"]});
        assert_eq!(cell_source(&cell), "line one\nline two");

        let cell = json!({"source": "whole"});
        assert_eq!(cell_source(&cell), "whole");

        assert_eq!(cell_source(&json!({})), "");
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut metadata = json!({});
        add_tag(&mut metadata, "needs_review");
        add_tag(&mut metadata, "needs_review");
        assert_eq!(metadata["tags"], json!(["needs_review"]));
    }
}
