/*! Structural chunking.

Document-type specific splitters turn a source file into an ordered list of
chunks (the unit of translation and cache identity), and segmenters turn a
single chunk into a stream of [Segment]s separating natural language from
syntax that must survive the model round trip byte-exact.
!*/
use std::path::Path;

pub mod latex;
pub mod latex_chunker;
pub mod myst;
pub mod myst_chunker;

/// One fragment of a chunk, as seen by the XML envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Translatable natural language.
    Text(String),
    /// Byte-exact syntax that must survive translation verbatim.
    Placeholder(String),
}

impl Segment {
    pub fn content(&self) -> &str {
        match self {
            Segment::Text(s) => s,
            Segment::Placeholder(s) => s,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Segment::Text(_))
    }
}

/// Segment accumulator shared by the segmenters.
///
/// `push_text` decides translatability: a fragment without a single
/// alphabetic character is syntax, not language, and leading whitespace is
/// split off so it can later fold into the preceding placeholder.
#[derive(Debug, Default)]
pub struct Segments {
    inner: Vec<Segment>,
}

impl Segments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        let trimmed = content.trim_start();
        let lead_len = content.len() - trimmed.len();
        if lead_len > 0 {
            self.inner
                .push(Segment::Placeholder(content[..lead_len].to_string()));
        }
        if trimmed.is_empty() {
            return;
        }
        if trimmed.chars().any(|c| c.is_alphabetic()) {
            self.inner.push(Segment::Text(trimmed.to_string()));
        } else {
            self.inner.push(Segment::Placeholder(trimmed.to_string()));
        }
    }

    pub fn push_placeholder(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        self.inner.push(Segment::Placeholder(content.to_string()));
    }

    pub fn into_vec(self) -> Vec<Segment> {
        self.inner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    LaTeX,
    JupyterNotebook,
    Markdown,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkType {
    LaTeX,
    MystBlock,
    Code,
    Other,
}

/// Extension-based document type detection with a small header sniff
/// distinguishing jupytext markdown notebooks from plain MyST files.
pub fn analyze_document_type(path: &Path) -> DocumentType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tex") => DocumentType::LaTeX,
        Some("ipynb") => DocumentType::JupyterNotebook,
        Some("md") => {
            if has_jupytext_header(path) {
                DocumentType::JupyterNotebook
            } else {
                DocumentType::Markdown
            }
        }
        _ => DocumentType::Other,
    }
}

/// true if the file opens with a YAML header declaring a jupytext
/// `text_representation` block.
fn has_jupytext_header(path: &Path) -> bool {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return false,
    };
    let mut lines = contents.lines();
    if lines.next().map(str::trim) != Some("---") {
        return false;
    }
    let mut saw_jupytext = false;
    let mut saw_representation = false;
    for (i, line) in lines.enumerate() {
        if line.trim() == "---" {
            break;
        }
        if i > 30 {
            return false;
        }
        if line.trim_start().starts_with("jupytext:") {
            saw_jupytext = true;
        }
        if line.trim_start().starts_with("text_representation:") {
            saw_representation = true;
        }
    }
    saw_jupytext && saw_representation
}

/// Segment a chunk according to its type.
///
/// Code chunks are opaque today: the pipeline is wired for a code-aware
/// segmenter but treats code blobs as placeholder-only.
pub fn segment_chunk(text: &str, chunk_type: ChunkType) -> Vec<Segment> {
    match chunk_type {
        ChunkType::LaTeX => latex::segment_latex(text),
        ChunkType::MystBlock => myst::segment_myst(text),
        ChunkType::Code => vec![Segment::Placeholder(text.to_string())],
        ChunkType::Other => {
            let mut segments = Segments::new();
            segments.push_text(text);
            segments.into_vec()
        }
    }
}

/// A chunk with no [Segment::Text] skips the model entirely.
pub fn placeholder_only(text: &str, chunk_type: ChunkType) -> bool {
    !segment_chunk(text, chunk_type).iter().any(Segment::is_text)
}

/// Fixed-size line windows for documents without structural markup.
pub fn divide_into_line_windows(text: &str, lines_per_chunk: usize) -> Vec<String> {
    if text.is_empty() || lines_per_chunk == 0 {
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut lines_in_current = 0;
    for line in text.split_inclusive('\n') {
        current.push_str(line);
        lines_in_current += 1;
        if lines_in_current == lines_per_chunk {
            chunks.push(std::mem::take(&mut current));
            lines_in_current = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
