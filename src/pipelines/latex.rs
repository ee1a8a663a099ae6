//! LaTeX file pipeline.
//!
//! Chunks come from the LaTeX document chunker; the target file interleaves
//! `%`-comment metadata fences with the translated chunks. The fences are
//! the rebuilder's input grammar and must be emitted byte-exact.
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::cache::store::CsvStore;
use crate::chunking::latex_chunker::split_latex_document;
use crate::chunking::{ChunkType, DocumentType};
use crate::checksum::checksum;
use crate::error::Error;
use crate::translate::chunk_translator::ChunkTranslator;
use crate::translate::Meta;

use super::{
    parse_metadata_lines, Cell, TranslateContext, KEY_NEEDS_REVIEW, KEY_NOT_TRANSLATED,
    KEY_SRC_CHECKSUM,
};

lazy_static! {
    static ref METADATA_BLOCK: Regex = Regex::new(
        r"(?s)(% --- CHUNK_METADATA_START ---\n.*?\n% --- CHUNK_METADATA_END ---\n)"
    )
    .unwrap();
}

fn format_metadata_block(cell: &Cell) -> String {
    let mut lines = vec!["% --- CHUNK_METADATA_START ---".to_string()];
    for (key, value) in cell.metadata.iter() {
        lines.push(format!("% {}: {}", key, value));
    }
    lines.push("% --- CHUNK_METADATA_END ---".to_string());
    lines.join("\n") + "\n"
}

/// Compile cells back into file contents, fences first.
pub fn compile_cells(cells: &[Cell]) -> String {
    let mut out = String::new();
    for cell in cells {
        out.push_str(&format_metadata_block(cell));
        out.push_str(&cell.source);
        out.push('\n');
    }
    out
}

/// Split a source file into metadata-less cells.
pub fn file_to_cells(path: &Path) -> Result<Vec<Cell>, Error> {
    let contents = fs::read_to_string(path)?;
    Ok(split_latex_document(&contents)
        .into_iter()
        .map(Cell::new)
        .collect())
}

/// Parse a translated file back into cells using the fence grammar.
pub fn read_chunks_with_metadata(path: &Path) -> Result<Vec<Cell>, Error> {
    let contents = fs::read_to_string(path)?;
    Ok(split_on_fences(&contents, &METADATA_BLOCK))
}

/// Shared fence splitter: alternate content/fence parts, attach each fence's
/// metadata to the following content block.
pub(crate) fn split_on_fences(contents: &str, fence: &Regex) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut current = Cell::default();
    let mut last_end = 0;

    let mut push_current = |cell: &mut Cell, upto: &str| {
        cell.source.push_str(upto);
        if !cell.source.trim().is_empty() {
            let mut done = std::mem::take(cell);
            done.source = done.source.trim().to_string();
            cells.push(done);
        } else {
            *cell = Cell::default();
        }
    };

    for m in fence.find_iter(contents) {
        push_current(&mut current, &contents[last_end..m.start()]);
        current.metadata = parse_metadata_lines(m.as_str());
        last_end = m.end();
    }
    push_current(&mut current, &contents[last_end..]);
    cells
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
        translate_cell(ctx, &translator, cell, DocumentType::LaTeX, ChunkType::LaTeX).await?;
    }

    fs::write(target_path, compile_cells(&cells))?;
    Ok(())
}

/// Translate one cell in place, tagging it for review and recovering from
/// per-chunk failures.
pub(crate) async fn translate_cell(
    ctx: &TranslateContext<'_>,
    translator: &ChunkTranslator<'_>,
    cell: &mut Cell,
    doc_type: DocumentType,
    chunk_type: ChunkType,
) -> Result<(), Error> {
    debug!("translating chunk of {} bytes", cell.source.len());
    cell.metadata.set(KEY_SRC_CHECKSUM, checksum(&cell.source));
    cell.metadata.set(KEY_NEEDS_REVIEW, "True");

    let mut meta = Meta::new(
        cell.source.clone(),
        ctx.src_lang,
        ctx.tgt_lang,
        doc_type,
        chunk_type,
        ctx.relative_path.clone(),
    );
    meta.vocab = ctx.vocab.clone();
    meta.project_description = ctx.project_description.clone();

    match translator.translate_or_fetch(meta).await {
        Ok(translated) => {
            cell.source = translated;
            Ok(())
        }
        Err(Error::ChunkTranslationFailed { text, cause }) => {
            log::error!("chunk left untranslated: {:?}", cause);
            cell.metadata.set(KEY_NOT_TRANSLATED, "True");
            cell.source = text;
            Ok(())
        }
        Err(other) => Err(other),
    }
}
