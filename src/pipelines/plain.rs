//! Fallback pipeline for documents without structural markup.
//!
//! Fixed 50-line windows through the plain prompt. No metadata fences: a
//! format we know nothing about has no comment syntax to hide them in, so
//! these files cannot be rebuilt from disk.
use std::fs;
use std::path::Path;

use crate::cache::store::CsvStore;
use crate::chunking::{divide_into_line_windows, ChunkType, DocumentType};
use crate::error::Error;
use crate::translate::chunk_translator::ChunkTranslator;
use crate::translate::Meta;

use super::TranslateContext;

pub const LINES_PER_CHUNK: usize = 50;

pub async fn translate_file(
    ctx: &TranslateContext<'_>,
    source_path: &Path,
    target_path: &Path,
) -> Result<(), Error> {
    let contents = fs::read_to_string(source_path)?;
    let store = CsvStore::new(ctx.root);
    let translator = ChunkTranslator::new(&store, ctx.caller).with_retry(ctx.retry);

    let mut translated = String::new();
    for window in divide_into_line_windows(&contents, LINES_PER_CHUNK) {
        let mut meta = Meta::new(
            window.clone(),
            ctx.src_lang,
            ctx.tgt_lang,
            DocumentType::Other,
            ChunkType::Other,
            ctx.relative_path.clone(),
        );
        meta.vocab = ctx.vocab.clone();
        meta.project_description = ctx.project_description.clone();

        match translator.translate_or_fetch(meta).await {
            Ok(text) => translated.push_str(&text),
            Err(Error::ChunkTranslationFailed { text, cause }) => {
                log::error!("window left untranslated: {:?}", cause);
                translated.push_str(&text);
            }
            Err(other) => return Err(other),
        }
    }

    fs::write(target_path, translated)?;
    Ok(())
}
