/*! Strategy selection.

An explicit table keyed by `(document type, chunk type)` decides how a chunk
is presented to the model and how the reply is post-processed. Strategies
are values with two operations (prompt builder, postprocess), not a trait
hierarchy.
!*/
use log::warn;

use crate::chunking::{segment_chunk, ChunkType, DocumentType};
use crate::envelope::{from_xml, to_xml};
use crate::translate::prompts;
use crate::translate::Meta;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Envelope the chunk, translate inside `<TEXT>`, reconstruct from
    /// `original` attributes.
    Xml,
    /// No envelope; the chunk rides in a plain `<document>` wrapper.
    Plain,
    /// No model call at all; the chunk is returned as-is (code cells).
    Identity,
}

/// The dispatch table of §"translator orchestrator": LaTeX and MyST chunks
/// go through the envelope, code is identity, everything else is plain.
pub fn select(doc_type: DocumentType, chunk_type: ChunkType) -> Strategy {
    match (doc_type, chunk_type) {
        (DocumentType::LaTeX, ChunkType::LaTeX) => Strategy::Xml,
        (DocumentType::JupyterNotebook, ChunkType::MystBlock) => Strategy::Xml,
        (DocumentType::Markdown, ChunkType::MystBlock) => Strategy::Xml,
        (DocumentType::JupyterNotebook, ChunkType::Code) => Strategy::Identity,
        (DocumentType::Other, ChunkType::Other) => Strategy::Plain,
        other => {
            warn!("no strategy for {:?}, falling back to plain prompt", other);
            Strategy::Plain
        }
    }
}

fn content_type(meta: &Meta) -> String {
    match (meta.doc_type, meta.chunk_type) {
        (DocumentType::LaTeX, _) => "LaTeX".to_string(),
        (DocumentType::JupyterNotebook, ChunkType::MystBlock)
        | (DocumentType::Markdown, _) => "MyST".to_string(),
        (DocumentType::JupyterNotebook, ChunkType::Code) => match &meta.prog_lang {
            Some(lang) => format!("{} code", lang),
            None => "code".to_string(),
        },
        _ => "any document".to_string(),
    }
}

impl Strategy {
    pub fn calls_model(&self) -> bool {
        !matches!(self, Strategy::Identity)
    }

    /// Build the final prompt for a chunk. The bool reports whether the
    /// chunk was enveloped.
    pub fn build_prompt(&self, meta: &Meta) -> (String, bool) {
        match self {
            Strategy::Identity => (meta.text.clone(), false),
            Strategy::Plain => {
                let prompt = prompts::for_languages(
                    prompts::PLAIN_PROMPT,
                    meta.tgt_lang,
                    Some(meta.src_lang),
                );
                let prompt = prompts::for_vocabulary(&prompt, meta.vocab.as_ref());
                let prompt = attach_project_description(prompt, meta);
                (prompts::finalize_plain(&prompt, &meta.text), false)
            }
            Strategy::Xml => {
                let (xml_chunk, _, _) = to_xml(segment_chunk(&meta.text, meta.chunk_type));

                let template = match &meta.example {
                    Some((src_example, tgt_example)) => {
                        let (src_xml, _, _) =
                            to_xml(segment_chunk(src_example, meta.chunk_type));
                        let (tgt_xml, _, _) =
                            to_xml(segment_chunk(tgt_example, meta.chunk_type));
                        prompts::for_example(prompts::XML_WITH_EXAMPLE_PROMPT, &src_xml, &tgt_xml)
                    }
                    None => prompts::XML_PROMPT.to_string(),
                };

                let prompt =
                    prompts::for_languages(&template, meta.tgt_lang, Some(meta.src_lang));
                let prompt = prompts::for_content_type(&prompt, &content_type(meta));
                let prompt = prompts::for_vocabulary(&prompt, meta.vocab.as_ref());
                let prompt = attach_project_description(prompt, meta);
                (prompts::finalize_xml(&prompt, &xml_chunk), true)
            }
        }
    }

    /// Turn the raw model reply into the translated chunk text.
    pub fn postprocess(&self, raw: &str) -> String {
        match self {
            Strategy::Identity => raw.to_string(),
            Strategy::Plain => prompts::extract_output(raw),
            Strategy::Xml => from_xml(&prompts::extract_output(raw)),
        }
    }
}

fn attach_project_description(prompt: String, meta: &Meta) -> String {
    if meta.project_description.is_empty() {
        return prompt;
    }
    format!(
        "{}\nThe document belongs to the following project: {}\n",
        prompt, meta.project_description
    )
}
