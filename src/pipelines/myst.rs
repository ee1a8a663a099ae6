//! MyST / Markdown file pipeline.
//!
//! Same shape as the LaTeX pipeline with the HTML-comment fence grammar.
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::cache::store::CsvStore;
use crate::chunking::myst_chunker::split_myst_document;
use crate::chunking::{ChunkType, DocumentType};
use crate::error::Error;
use crate::translate::chunk_translator::ChunkTranslator;

use super::latex::{split_on_fences, translate_cell};
use super::{Cell, TranslateContext};

lazy_static! {
    static ref METADATA_BLOCK: Regex = Regex::new(
        r"(?s)(<!-- --- CHUNK_METADATA_START ---\n.*?\n --- CHUNK_METADATA_END --- -->\n)"
    )
    .unwrap();
}

fn format_metadata_block(cell: &Cell) -> String {
    let mut lines = vec!["\n<!-- --- CHUNK_METADATA_START ---".to_string()];
    for (key, value) in cell.metadata.iter() {
        lines.push(format!("% {}: {}", key, value));
    }
    lines.push(" --- CHUNK_METADATA_END --- -->".to_string());
    lines.join("\n") + "\n"
}

pub fn compile_cells(cells: &[Cell]) -> String {
    let mut out = String::new();
    for cell in cells {
        out.push_str(&format_metadata_block(cell));
        out.push_str(&cell.source);
        out.push('\n');
    }
    out
}

pub fn file_to_cells(path: &Path) -> Result<Vec<Cell>, Error> {
    let contents = fs::read_to_string(path)?;
    Ok(split_myst_document(&contents)
        .into_iter()
        .map(Cell::new)
        .collect())
}

pub fn read_chunks_with_metadata(path: &Path) -> Result<Vec<Cell>, Error> {
    let contents = fs::read_to_string(path)?;
    Ok(split_on_fences(&contents, &METADATA_BLOCK))
}

pub async fn translate_file(
    ctx: &TranslateContext<'_>,
    source_path: &Path,
    target_path: &Path,
) -> Result<(), Error> {
    let mut cells = file_to_cells(source_path)?;
    let store = CsvStore::new(ctx.root);
    let translator = ChunkTranslator::new(&store, ctx.caller).with_retry(ctx.retry);

    for cell in &mut cells {
        translate_cell(
            ctx,
            &translator,
            cell,
            DocumentType::Markdown,
            ChunkType::MystBlock,
        )
        .await?;
    }

    fs::write(target_path, compile_cells(&cells))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::KEY_SRC_CHECKSUM;

    #[test]
    fn fences_roundtrip_through_the_parser() {
        let mut cell = Cell::new("# Titre\n\nDu texte.");
        cell.metadata.set(KEY_SRC_CHECKSUM, "abc123");

        let compiled = compile_cells(&[cell]);
        assert!(compiled.contains(
            "<!-- --- CHUNK_METADATA_START ---\n% src_checksum: abc123\n --- CHUNK_METADATA_END --- -->\n"
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.md");
        std::fs::write(&path, &compiled).unwrap();

        let cells = read_chunks_with_metadata(&path).unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].source, "# Titre\n\nDu texte.");
        assert_eq!(cells[0].metadata.get(KEY_SRC_CHECKSUM), Some("abc123"));
    }
}
