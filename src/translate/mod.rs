/*! Translation orchestration.

The [chunk_translator::ChunkTranslator] decides, per chunk, whether to hit
the cache, skip the model (whitespace or placeholder-only chunks), or build a
prompt through the strategy selected by `(document type, chunk type)` and
call the transport with overload retry.
!*/
pub mod chunk_translator;
pub mod model;
pub mod prompts;
pub mod retrieval;
pub mod strategy;

use crate::chunking::{ChunkType, DocumentType};
use crate::lang::Lang;
use crate::vocab::VocabList;

/// Everything the orchestrator needs to know about one chunk.
#[derive(Debug, Clone)]
pub struct Meta {
    pub text: String,
    pub src_lang: Lang,
    pub tgt_lang: Lang,
    pub doc_type: DocumentType,
    pub chunk_type: ChunkType,
    pub vocab: Option<VocabList>,
    pub relative_path: String,
    pub project_description: String,
    /// language of a code chunk, when known
    pub prog_lang: Option<String>,
    /// `(src_example, tgt_example)` few-shot upgrade from the retriever
    pub example: Option<(String, String)>,
}

impl Meta {
    pub fn new(
        text: impl Into<String>,
        src_lang: Lang,
        tgt_lang: Lang,
        doc_type: DocumentType,
        chunk_type: ChunkType,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            src_lang,
            tgt_lang,
            doc_type,
            chunk_type,
            vocab: None,
            relative_path: relative_path.into(),
            project_description: String::new(),
            prog_lang: None,
            example: None,
        }
    }
}
