/*! LaTeX document chunker.

Splits a document into preamble / `\begin{document}` / body chunks /
`\end{document}`. Inside the body, every top-level environment and every
block-level macro (sectioning commands) becomes its own chunk; runs of inline
material accumulate until a blank line or the inline length cap flushes them.
!*/
use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::latex::{consume_args, find_env_end, find_group_end, read_macro_name};

/// Macros that become standalone chunks even though they carry arguments.
lazy_static! {
    static ref BLOCK_LEVEL_MACROS: HashSet<&'static str> = [
        "section", "subsection", "subsubsection", "chapter", "part",
        "paragraph", "subparagraph", "title", "maketitle",
    ]
    .into_iter()
    .collect();

    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n\s*\n+").unwrap();
}

/// Upper bound for inline chunks so paragraphs with inline macros stay
/// together but do not grow without limit.
const MAX_INLINE_CHUNK_LENGTH: usize = 600;

const BEGIN_DOCUMENT: &str = r"\begin{document}";
const END_DOCUMENT: &str = r"\end{document}";

/// Split a LaTeX document into translation chunks.
pub fn split_latex_document(source: &str) -> Vec<String> {
    let mut chunks = Vec::new();

    match source.find(BEGIN_DOCUMENT) {
        Some(doc_start) => {
            let preamble = source[..doc_start].trim();
            if !preamble.is_empty() {
                chunks.push(preamble.to_string());
            }
            chunks.push(BEGIN_DOCUMENT.to_string());

            let body_start = doc_start + BEGIN_DOCUMENT.len();
            let body_end = find_env_end(source, "document", body_start, source.len())
                .map(|(end_start, _)| end_start)
                .unwrap_or(source.len());
            chunk_region(source, body_start, body_end, &mut chunks);

            if source[body_end..].starts_with(END_DOCUMENT) {
                chunks.push(END_DOCUMENT.to_string());
            }
        }
        None => chunk_region(source, 0, source.len(), &mut chunks),
    }

    chunks
}

struct InlineRun {
    parts: Vec<String>,
    len: usize,
}

impl InlineRun {
    fn new() -> Self {
        Self {
            parts: Vec::new(),
            len: 0,
        }
    }

    fn append(&mut self, chunks: &mut Vec<String>, segment: &str) {
        if segment.is_empty() {
            return;
        }
        self.parts.push(segment.to_string());
        self.len += segment.len();
        if self.len >= MAX_INLINE_CHUNK_LENGTH {
            self.flush(chunks);
        }
    }

    fn flush(&mut self, chunks: &mut Vec<String>) {
        if self.parts.is_empty() {
            return;
        }
        let combined = self.parts.concat();
        let combined = combined.trim();
        if !combined.is_empty() {
            chunks.push(combined.to_string());
        }
        self.parts.clear();
        self.len = 0;
    }
}

fn chunk_region(source: &str, start: usize, end: usize, chunks: &mut Vec<String>) {
    let bytes = source.as_bytes();
    let mut run = InlineRun::new();
    let mut pos = start;
    let mut chars_start = start;

    let flush_chars = |run: &mut InlineRun, chunks: &mut Vec<String>, upto: usize, from: usize| {
        if upto <= from {
            return;
        }
        let raw = &source[from..upto];
        let paragraphs: Vec<&str> = PARAGRAPH_BREAK.split(raw).collect();
        let many = paragraphs.len() > 1;
        for (idx, para) in paragraphs.iter().copied().enumerate() {
            if para.trim().is_empty() {
                continue;
            }
            run.append(chunks, para);
            if many && idx < paragraphs.len() - 1 {
                run.flush(chunks);
            }
        }
        // a trailing blank line closes the current inline run
        if raw.trim_end().len() < raw.len() && PARAGRAPH_BREAK.is_match(raw) {
            run.flush(chunks);
        }
    };

    while pos < end {
        if bytes[pos] != b'\\' {
            pos += 1;
            continue;
        }
        let (name, after_name) = read_macro_name(source, pos);
        if name == "begin" {
            if bytes.get(after_name) != Some(&b'{') {
                pos = after_name;
                continue;
            }
            let Some(name_close) = find_group_end(source, after_name).filter(|&c| c <= end)
            else {
                pos = after_name;
                continue;
            };
            let env_name = &source[after_name + 1..name_close - 1];
            let Some((_, env_end)) = find_env_end(source, env_name, name_close, end) else {
                pos = name_close;
                continue;
            };
            flush_chars(&mut run, chunks, pos, chars_start);
            run.flush(chunks);
            let content = source[pos..env_end].trim();
            if !content.is_empty() {
                chunks.push(content.to_string());
            }
            pos = env_end;
            chars_start = pos;
            continue;
        }

        if name.is_empty() {
            pos += 2;
            continue;
        }

        let star = bytes.get(after_name) == Some(&b'*');
        let after_star = if star { after_name + 1 } else { after_name };
        let args_end = consume_args(source, after_star, end);
        let has_args = args_end > after_star;

        if has_args && BLOCK_LEVEL_MACROS.contains(name) {
            flush_chars(&mut run, chunks, pos, chars_start);
            run.flush(chunks);
            let content = source[pos..args_end].trim();
            if !content.is_empty() {
                chunks.push(content.to_string());
            }
        } else {
            flush_chars(&mut run, chunks, pos, chars_start);
            run.append(chunks, &source[pos..args_end.max(after_star)]);
        }
        pos = args_end.max(after_star);
        chars_start = pos;
    }

    flush_chars(&mut run, chunks, end, chars_start);
    run.flush(chunks);
}
