/*! LaTeX segmenter.

Walks LaTeX source and classifies it into translatable text and opaque
placeholders. Verbatim-like constructs (`\verb|…|`, `\cmd*?|…|`) are lifted
out with UUID-tagged sentinels before the walk and restored afterwards, so
the scanner never sees unbalanced delimiters.

Inside math only the text-in-math macros (`\text`, `\mathrm`, …) open a
translatable subwalk; inside alignment environments the `&` column separator
is emitted as its own placeholder so cells stay individually translatable.
!*/
use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use super::{Segment, Segments};

lazy_static! {
    /// Macros whose whole span (arguments included) is opaque.
    static ref OPAQUE_MACROS: HashSet<&'static str> = [
        "ref", "eqref", "pageref", "cite", "citep", "citet", "label",
        "includegraphics", "input", "include", "frac", "sqrt", "path", "url",
        "href", "verb", "part", "chapter", "section", "subsection",
        "subsubsection", "paragraph", "subparagraph", "title", "author",
        "date", "maketitle", "documentclass", "usepackage",
    ]
    .into_iter()
    .collect();

    static ref OPAQUE_ENVS: HashSet<&'static str> =
        ["verbatim", "Verbatim", "lstlisting", "minted"].into_iter().collect();

    static ref MATH_ENVS: HashSet<&'static str> = [
        "equation", "equation*", "align", "align*", "aligned", "gather",
        "gather*", "gathered", "flalign", "flalign*", "alignat", "alignat*",
        "multline", "multline*", "displaymath", "math",
    ]
    .into_iter()
    .collect();

    static ref MATH_TEXT_MACROS: HashSet<&'static str> = [
        "text", "mathrm", "mathbf", "operatorname", "mathit", "textrm",
        "textit", "mathsf", "mathtt", "boldsymbol",
    ]
    .into_iter()
    .collect();

    static ref DEFINITION_MACROS: HashSet<&'static str> = [
        "newcommand", "renewcommand", "newenvironment", "renewenvironment",
        "def",
    ]
    .into_iter()
    .collect();

    static ref ALIGNMENT_ENVS: HashSet<&'static str> = [
        "tabular", "tabular*", "array", "align", "align*", "aligned",
        "flalign", "flalign*", "alignat", "alignat*", "gather", "gather*",
    ]
    .into_iter()
    .collect();

    /// Environments whose `\begin` is followed by required brace arguments.
    static ref ENVS_WITH_ARGS: HashSet<&'static str> =
        ["tabular", "tabular*", "array", "alignat", "alignat*", "minipage"]
            .into_iter()
            .collect();

    /// `\cmd|…|` and `\cmd*|…|` with arbitrary command names.
    static ref PIPE_COMMAND: Regex =
        Regex::new(r"\\([a-zA-Z]+)\*?\|[\s\S]*?\|").unwrap();
}

/// Segment a LaTeX chunk.
pub fn segment_latex(source: &str) -> Vec<Segment> {
    let mut sentinels: HashMap<String, String> = HashMap::new();
    let extracted = extract_verb_commands(source, &mut sentinels);
    let extracted = extract_pipe_commands(&extracted, &mut sentinels);

    // A dangling `\end{document}` means we were handed the closing chunk of a
    // split document; it carries no prose.
    if extracted.contains(r"\end{document}") && !extracted.contains(r"\begin{document}") {
        return vec![Segment::Placeholder(source.to_string())];
    }

    let mut walker = Walker::new(&extracted);
    walker.walk_text(0, extracted.len(), &mut Vec::new());
    let segments = walker.segments.into_vec();

    restore_sentinels(segments, &sentinels)
}

fn make_sentinel(tag: &str) -> String {
    format!("<<{}_{}>>", tag, Uuid::new_v4().simple())
}

/// Lift `\verb<delim>…<delim>` spans out of the source. The delimiter is the
/// first character after the (possibly starred) command, which the regex
/// crate cannot express without backreferences, so this is a manual scan.
fn extract_verb_commands(source: &str, sentinels: &mut HashMap<String, String>) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut pos = 0;
    while let Some(found) = source[pos..].find(r"\verb") {
        let start = pos + found;
        let mut cursor = start + r"\verb".len();
        if bytes.get(cursor) == Some(&b'*') {
            cursor += 1;
        }
        let delim = match source[cursor..].chars().next() {
            Some(c) => c,
            None => break,
        };
        // letters never delimit \verb; this is some \verbatim-like macro
        if delim.is_ascii_alphanumeric() {
            out.push_str(&source[pos..cursor]);
            pos = cursor;
            continue;
        }
        let content_start = cursor + delim.len_utf8();
        let close = match source[content_start..].find(delim) {
            Some(i) => content_start + i + delim.len_utf8(),
            None => break,
        };
        out.push_str(&source[pos..start]);
        let sentinel = make_sentinel("VERB");
        sentinels.insert(sentinel.clone(), source[start..close].to_string());
        out.push_str(&sentinel);
        pos = close;
    }
    out.push_str(&source[pos..]);
    out
}

fn extract_pipe_commands(source: &str, sentinels: &mut HashMap<String, String>) -> String {
    PIPE_COMMAND
        .replace_all(source, |caps: &regex::Captures| {
            if caps[1].eq_ignore_ascii_case("verb") {
                return caps[0].to_string();
            }
            let sentinel = make_sentinel("PIPE");
            sentinels.insert(sentinel.clone(), caps[0].to_string());
            sentinel
        })
        .into_owned()
}

/// Replace every sentinel occurrence with its original bytes, splitting text
/// segments where a sentinel interrupts prose.
fn restore_sentinels(segments: Vec<Segment>, sentinels: &HashMap<String, String>) -> Vec<Segment> {
    if sentinels.is_empty() {
        return segments;
    }
    let mut restored = Segments::new();
    for segment in segments {
        match segment {
            Segment::Placeholder(mut content) => {
                for (sentinel, original) in sentinels {
                    if content.contains(sentinel.as_str()) {
                        content = content.replace(sentinel.as_str(), original);
                    }
                }
                restored.push_placeholder(&content);
            }
            Segment::Text(content) => split_text_on_sentinels(&content, sentinels, &mut restored),
        }
    }
    restored.into_vec()
}

fn split_text_on_sentinels(
    content: &str,
    sentinels: &HashMap<String, String>,
    out: &mut Segments,
) {
    for (sentinel, original) in sentinels {
        if let Some(at) = content.find(sentinel.as_str()) {
            split_text_on_sentinels(&content[..at], sentinels, out);
            out.push_placeholder(original);
            split_text_on_sentinels(&content[at + sentinel.len()..], sentinels, out);
            return;
        }
    }
    out.push_text(content);
}

struct Walker<'a> {
    src: &'a str,
    segments: Segments,
}

impl<'a> Walker<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            segments: Segments::new(),
        }
    }

    fn in_alignment(env_stack: &[String]) -> bool {
        env_stack
            .last()
            .map(|e| ALIGNMENT_ENVS.contains(e.as_str()))
            .unwrap_or(false)
    }

    fn push_chars(&mut self, run: &str, env_stack: &[String]) {
        if run.is_empty() {
            return;
        }
        if Self::in_alignment(env_stack) {
            let mut rest = run;
            while let Some(at) = rest.find('&') {
                self.segments.push_text(&rest[..at]);
                self.segments.push_placeholder("&");
                rest = &rest[at + 1..];
            }
            self.segments.push_text(rest);
        } else {
            self.segments.push_text(run);
        }
    }

    /// Text-mode walk over `src[start..end]`.
    fn walk_text(&mut self, start: usize, end: usize, env_stack: &mut Vec<String>) {
        let bytes = self.src.as_bytes();
        let mut pos = start;
        let mut run_start = start;
        while pos < end {
            match bytes[pos] {
                b'%' => {
                    self.push_chars(&self.src[run_start..pos], env_stack);
                    pos = self.emit_comment(pos, end);
                    run_start = pos;
                }
                b'$' => {
                    self.push_chars(&self.src[run_start..pos], env_stack);
                    pos = self.emit_dollar_math(pos, end, env_stack);
                    run_start = pos;
                }
                b'{' => {
                    self.push_chars(&self.src[run_start..pos], env_stack);
                    match find_group_end(self.src, pos).filter(|&c| c <= end) {
                        Some(close) => {
                            self.segments.push_placeholder("{");
                            self.walk_text(pos + 1, close - 1, env_stack);
                            self.segments.push_placeholder("}");
                            pos = close;
                        }
                        None => {
                            self.segments.push_placeholder("{");
                            pos += 1;
                        }
                    }
                    run_start = pos;
                }
                b'}' => {
                    // unbalanced close, keep it verbatim
                    self.push_chars(&self.src[run_start..pos], env_stack);
                    self.segments.push_placeholder("}");
                    pos += 1;
                    run_start = pos;
                }
                b'\\' => {
                    self.push_chars(&self.src[run_start..pos], env_stack);
                    pos = self.emit_control_sequence(pos, end, env_stack);
                    run_start = pos;
                }
                _ => pos += 1,
            }
        }
        self.push_chars(&self.src[run_start..end.max(run_start)], env_stack);
    }

    fn emit_comment(&mut self, pos: usize, end: usize) -> usize {
        let line_end = self.src[pos..end]
            .find('\n')
            .map(|i| pos + i)
            .unwrap_or(end);
        self.segments.push_placeholder("%");
        self.segments.push_text(&self.src[pos + 1..line_end]);
        if line_end < end {
            self.segments.push_placeholder("\n");
            line_end + 1
        } else {
            line_end
        }
    }

    fn emit_dollar_math(&mut self, pos: usize, end: usize, env_stack: &mut Vec<String>) -> usize {
        let display = self.src[pos..end].starts_with("$$");
        let delim = if display { "$$" } else { "$" };
        let inner_start = pos + delim.len();
        let close = find_unescaped(self.src, delim, inner_start, end);
        match close {
            Some(close) => {
                self.segments.push_placeholder(delim);
                self.walk_math(inner_start, close, env_stack);
                self.segments.push_placeholder(delim);
                close + delim.len()
            }
            None => {
                // unterminated math: keep the rest opaque
                self.segments.push_placeholder(&self.src[pos..end]);
                end
            }
        }
    }

    fn emit_control_sequence(
        &mut self,
        pos: usize,
        end: usize,
        env_stack: &mut Vec<String>,
    ) -> usize {
        let bytes = self.src.as_bytes();
        let Some(&next) = bytes.get(pos + 1) else {
            self.segments.push_placeholder("\\");
            return end;
        };

        // \( … \) and \[ … \] math delimiters
        if next == b'(' || next == b'[' {
            let (open, close) = if next == b'(' {
                (r"\(", r"\)")
            } else {
                (r"\[", r"\]")
            };
            if let Some(close_at) = find_unescaped(self.src, close, pos + 2, end) {
                self.segments.push_placeholder(open);
                self.walk_math(pos + 2, close_at, env_stack);
                self.segments.push_placeholder(close);
                return close_at + 2;
            }
            self.segments.push_placeholder(&self.src[pos..end]);
            return end;
        }

        if !next.is_ascii_alphabetic() {
            // single-character macro (\\, \%, \&, \#, \_, …)
            self.segments.push_placeholder(&self.src[pos..pos + 2]);
            return pos + 2;
        }

        let (name, after_name) = read_macro_name(self.src, pos);
        let star = self.src.as_bytes().get(after_name) == Some(&b'*');
        let after_star = if star { after_name + 1 } else { after_name };

        if name == "begin" {
            return self.emit_environment(pos, after_star, end, env_stack);
        }
        if name == "end" {
            // stray \end without begin; keep the whole token opaque
            let close = if self.src.as_bytes().get(after_star) == Some(&b'{') {
                find_group_end(self.src, after_star).unwrap_or(after_star)
            } else {
                after_star
            };
            self.segments.push_placeholder(&self.src[pos..close.max(after_star)]);
            return close.max(after_star);
        }

        if DEFINITION_MACROS.contains(name) {
            return self.emit_definition(pos, after_star, end);
        }

        let args_end = consume_args(self.src, after_star, end);
        if OPAQUE_MACROS.contains(name) {
            self.segments.push_placeholder(&self.src[pos..args_end]);
            return args_end;
        }

        // command token opaque, arguments walked for prose
        self.segments.push_placeholder(&self.src[pos..after_star]);
        let mut cursor = after_star;
        while cursor < args_end {
            match self.src.as_bytes()[cursor] {
                b'{' => match find_group_end(self.src, cursor).filter(|&c| c <= args_end) {
                    Some(close) => {
                        self.segments.push_placeholder("{");
                        self.walk_text(cursor + 1, close - 1, env_stack);
                        self.segments.push_placeholder("}");
                        cursor = close;
                    }
                    None => break,
                },
                b'[' => match find_optional_end(self.src, cursor).filter(|&c| c <= args_end) {
                    Some(close) => {
                        self.segments.push_placeholder("[");
                        self.walk_text(cursor + 1, close - 1, env_stack);
                        self.segments.push_placeholder("]");
                        cursor = close;
                    }
                    None => break,
                },
                _ => break,
            }
        }
        cursor.max(after_star)
    }

    /// Consume the argument groups following a macro or `\begin{env}` token.
    fn env_body_start(&self, name: &str, after_name_close: usize, limit: usize) -> usize {
        let bytes = self.src.as_bytes();
        let mut cursor = after_name_close;
        // optional arguments first (placement, vertical alignment, …)
        while bytes.get(cursor) == Some(&b'[') {
            match find_optional_end(self.src, cursor).filter(|&c| c <= limit) {
                Some(close) => cursor = close,
                None => return cursor,
            }
        }
        if !ENVS_WITH_ARGS.contains(name) {
            return cursor;
        }
        while bytes.get(cursor) == Some(&b'{') {
            match find_group_end(self.src, cursor).filter(|&c| c <= limit) {
                Some(close) => cursor = close,
                None => return cursor,
            }
        }
        cursor
    }

    fn emit_environment(
        &mut self,
        begin_pos: usize,
        after_begin: usize,
        end: usize,
        env_stack: &mut Vec<String>,
    ) -> usize {
        if self.src.as_bytes().get(after_begin) != Some(&b'{') {
            self.segments.push_placeholder(&self.src[begin_pos..after_begin]);
            return after_begin;
        }
        let Some(name_close) = find_group_end(self.src, after_begin).filter(|&c| c <= end) else {
            self.segments.push_placeholder(&self.src[begin_pos..end]);
            return end;
        };
        let env_name = self.src[after_begin + 1..name_close - 1].to_string();

        let Some((end_start, end_end)) = find_env_end(self.src, &env_name, name_close, end) else {
            self.segments.push_placeholder(&self.src[begin_pos..end]);
            return end;
        };

        if OPAQUE_ENVS.contains(env_name.as_str()) {
            self.segments.push_placeholder(&self.src[begin_pos..end_end]);
            return end_end;
        }

        // `\begin{name}` plus environment arguments (tabular column specs,
        // optional placement, …) form the opening placeholder.
        let body_start = self.env_body_start(&env_name, name_close, end_start);
        self.segments
            .push_placeholder(&self.src[begin_pos..body_start]);

        env_stack.push(env_name.clone());
        if MATH_ENVS.contains(env_name.as_str()) {
            self.walk_math(body_start, end_start, env_stack);
        } else {
            self.walk_text(body_start, end_start, env_stack);
        }
        env_stack.pop();

        self.segments.push_placeholder(&self.src[end_start..end_end]);
        end_end
    }

    /// `\newcommand{\foo}[2]{body}`: the command and all syntax arguments are
    /// opaque; the definition body is walked with `#n` markers preserved.
    fn emit_definition(&mut self, pos: usize, after_star: usize, end: usize) -> usize {
        let mut args: Vec<(usize, usize, u8)> = Vec::new();
        let mut cursor = after_star;
        while cursor < end {
            match self.src.as_bytes().get(cursor) {
                Some(b'{') => {
                    let Some(close) = find_group_end(self.src, cursor).filter(|&c| c <= end) else {
                        break;
                    };
                    args.push((cursor, close, b'{'));
                    cursor = close;
                }
                Some(b'[') => {
                    let Some(close) = find_optional_end(self.src, cursor).filter(|&c| c <= end)
                    else {
                        break;
                    };
                    args.push((cursor, close, b'['));
                    cursor = close;
                }
                Some(b'\\') => {
                    // control-sequence argument (`\def\foo…`)
                    let (_, after) = read_macro_name(self.src, cursor);
                    if after == cursor + 1 {
                        break;
                    }
                    args.push((cursor, after, b'\\'));
                    cursor = after;
                }
                _ => break,
            }
        }

        let body = args.iter().rposition(|&(_, _, kind)| kind == b'{');
        let Some(body_idx) = body else {
            self.segments.push_placeholder(&self.src[pos..cursor.max(after_star)]);
            return cursor.max(after_star);
        };
        let (body_open, body_close, _) = args[body_idx];

        self.segments.push_placeholder(&self.src[pos..body_open]);
        self.segments.push_placeholder("{");
        self.walk_definition(body_open + 1, body_close - 1);
        self.segments.push_placeholder("}");
        body_close
    }

    /// Definition bodies: `#` parameter markers stay opaque, math is opaque,
    /// nested groups recurse, anything else falls back to the text walk.
    fn walk_definition(&mut self, start: usize, end: usize) {
        let bytes = self.src.as_bytes();
        let mut pos = start;
        let mut run_start = start;
        while pos < end {
            match bytes[pos] {
                b'#' => {
                    self.segments.push_text(&self.src[run_start..pos]);
                    let mut marker_end = pos + 1;
                    while marker_end < end && bytes[marker_end].is_ascii_digit() {
                        marker_end += 1;
                    }
                    self.segments.push_placeholder(&self.src[pos..marker_end]);
                    pos = marker_end;
                    run_start = pos;
                }
                b'$' => {
                    self.segments.push_text(&self.src[run_start..pos]);
                    let display = self.src[pos..end].starts_with("$$");
                    let delim = if display { "$$" } else { "$" };
                    let close = find_unescaped(self.src, delim, pos + delim.len(), end)
                        .map(|c| c + delim.len())
                        .unwrap_or(end);
                    self.segments.push_placeholder(&self.src[pos..close]);
                    pos = close;
                    run_start = pos;
                }
                b'{' => {
                    self.segments.push_text(&self.src[run_start..pos]);
                    match find_group_end(self.src, pos).filter(|&c| c <= end) {
                        Some(close) => {
                            self.segments.push_placeholder("{");
                            self.walk_definition(pos + 1, close - 1);
                            self.segments.push_placeholder("}");
                            pos = close;
                        }
                        None => {
                            self.segments.push_placeholder("{");
                            pos += 1;
                        }
                    }
                    run_start = pos;
                }
                b'\\' => {
                    self.segments.push_text(&self.src[run_start..pos]);
                    pos = self.emit_control_sequence(pos, end, &mut Vec::new());
                    run_start = pos;
                }
                _ => pos += 1,
            }
        }
        self.segments.push_text(&self.src[run_start..end.max(run_start)]);
    }

    /// Math-mode walk: everything is opaque except the text-in-math macros,
    /// whose brace arguments reopen the text walk.
    fn walk_math(&mut self, start: usize, end: usize, env_stack: &mut Vec<String>) {
        let bytes = self.src.as_bytes();
        let mut pos = start;
        let mut opaque_start = start;
        while pos < end {
            if bytes[pos] != b'\\' {
                pos += 1;
                continue;
            }
            let (name, after_name) = read_macro_name(self.src, pos);
            if name.is_empty() || !MATH_TEXT_MACROS.contains(name) {
                pos = after_name.max(pos + 1);
                continue;
            }
            self.segments.push_placeholder(&self.src[opaque_start..pos]);
            self.segments.push_placeholder(&self.src[pos..after_name]);
            let mut cursor = after_name;
            while self.src.as_bytes().get(cursor) == Some(&b'{') {
                let Some(close) = find_group_end(self.src, cursor).filter(|&c| c <= end) else {
                    break;
                };
                self.segments.push_placeholder("{");
                self.walk_text(cursor + 1, close - 1, env_stack);
                self.segments.push_placeholder("}");
                cursor = close;
            }
            pos = cursor;
            opaque_start = cursor;
        }
        self.segments
            .push_placeholder(&self.src[opaque_start..end.max(opaque_start)]);
    }
}

/// Read a backslash control word at `pos`. Returns the name (may be empty for
/// single-character macros) and the byte offset just past it.
pub(crate) fn read_macro_name(src: &str, pos: usize) -> (&str, usize) {
    let bytes = src.as_bytes();
    debug_assert_eq!(bytes.get(pos), Some(&b'\\'));
    let mut end = pos + 1;
    while end < src.len() && bytes[end].is_ascii_alphabetic() {
        end += 1;
    }
    (&src[pos + 1..end], end)
}

/// Offset just past the `}` matching the `{` at `open`, honoring nesting and
/// backslash escapes.
pub(crate) fn find_group_end(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    debug_assert_eq!(bytes.get(open), Some(&b'{'));
    let mut depth = 0usize;
    let mut pos = open;
    while pos < src.len() {
        match bytes[pos] {
            b'\\' => pos += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(pos + 1);
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Offset just past the consecutive `{…}` / `[…]` argument groups starting at
/// `from`. Stops at the first byte that opens neither kind of group.
pub(crate) fn consume_args(src: &str, from: usize, limit: usize) -> usize {
    let bytes = src.as_bytes();
    let mut cursor = from;
    while cursor < limit {
        let close = match bytes[cursor] {
            b'{' => find_group_end(src, cursor),
            b'[' => find_optional_end(src, cursor),
            _ => break,
        };
        match close.filter(|&c| c <= limit) {
            Some(c) => cursor = c,
            None => break,
        }
    }
    cursor
}

fn find_optional_end(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut pos = open + 1;
    while pos < src.len() {
        match bytes[pos] {
            b'\\' => pos += 1,
            b']' => return Some(pos + 1),
            _ => {}
        }
        pos += 1;
    }
    None
}

/// First occurrence of `needle` in `src[from..to]` not preceded by a
/// backslash.
fn find_unescaped(src: &str, needle: &str, from: usize, to: usize) -> Option<usize> {
    let mut pos = from;
    while pos < to {
        match src[pos..to].find(needle) {
            Some(i) => {
                let at = pos + i;
                if at > 0 && src.as_bytes()[at - 1] == b'\\' {
                    pos = at + needle.len();
                } else {
                    return Some(at);
                }
            }
            None => return None,
        }
    }
    None
}

/// Span of the `\end{name}` matching an already-open environment, handling
/// same-name nesting. Returns `(start_of_end_macro, end_of_end_macro)`.
pub(crate) fn find_env_end(
    src: &str,
    name: &str,
    from: usize,
    to: usize,
) -> Option<(usize, usize)> {
    let begin_tag = format!("\\begin{{{}}}", name);
    let end_tag = format!("\\end{{{}}}", name);
    let mut depth = 0usize;
    let mut pos = from;
    while pos < to {
        let next_begin = src[pos..to].find(&begin_tag).map(|i| pos + i);
        let next_end = src[pos..to].find(&end_tag).map(|i| pos + i);
        match (next_begin, next_end) {
            (Some(b), Some(e)) if b < e => {
                depth += 1;
                pos = b + begin_tag.len();
            }
            (_, Some(e)) => {
                if depth == 0 {
                    return Some((e, e + end_tag.len()));
                }
                depth -= 1;
                pos = e + end_tag.len();
            }
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{placeholder_only, ChunkType};

    fn reconstruct(segments: &[Segment]) -> String {
        segments.iter().map(Segment::content).collect()
    }

    #[test]
    fn heading_reference_and_punctuation_are_opaque() {
        let chunk = "\\section*{Introduction}\nPlease translate me. See \\ref{eq:1}.";
        let segments = segment_latex(chunk);

        let texts: Vec<&Segment> = segments.iter().filter(|s| s.is_text()).collect();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].content(), "Please translate me. See ");
        assert_eq!(reconstruct(&segments), chunk);
    }

    #[test]
    fn inline_math_is_opaque() {
        let segments = segment_latex("The identity $e^{i\\pi} = -1$ holds.");
        assert_eq!(
            reconstruct(&segments),
            "The identity $e^{i\\pi} = -1$ holds."
        );
        let math: Vec<&str> = segments
            .iter()
            .filter(|s| !s.is_text())
            .map(Segment::content)
            .collect();
        assert!(math.contains(&"e^{i\\pi} = -1"));
        assert!(segments.iter().any(|s| s.content() == "The identity "));
    }

    #[test]
    fn text_in_math_macro_reopens_text_mode() {
        let src = "\\begin{align*}\na &= b \\text{ si tout va bien}\n\\end{align*}";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments
            .iter()
            .any(|s| s.is_text() && s.content().contains("si tout va bien")));
        // the alignment separator never leaks into a text segment
        assert!(segments
            .iter()
            .filter(|s| s.is_text())
            .all(|s| !s.content().contains('&')));
    }

    #[test]
    fn tabular_cells_are_individually_translatable() {
        let src = "\\begin{tabular}{|c|c|}\nun chat & un chien \\\\\n\\end{tabular}";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments.iter().any(|s| s == &Segment::Placeholder("&".into())));
        let texts: Vec<&str> = segments
            .iter()
            .filter(|s| s.is_text())
            .map(Segment::content)
            .collect();
        assert!(texts.contains(&"un chat "));
        assert!(texts.contains(&"un chien "));
        // the column spec belongs to the opening placeholder
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content().contains("\\begin{tabular}{|c|c|}")));
    }

    #[test]
    fn verbatim_environment_is_one_placeholder() {
        let src = "Before.\n\\begin{verbatim}\nx & y $ z\n\\end{verbatim}\nAfter.";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments.iter().any(
            |s| !s.is_text() && s.content() == "\\begin{verbatim}\nx & y $ z\n\\end{verbatim}"
        ));
    }

    #[test]
    fn verb_survives_roundtrip() {
        let src = "Call \\verb|printf(\"hi\")| somewhere.";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == "\\verb|printf(\"hi\")|"));
    }

    #[test]
    fn pipe_command_survives_roundtrip() {
        let src = "See \\mymacro|raw & bytes| here.";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == "\\mymacro|raw & bytes|"));
    }

    #[test]
    fn definition_macro_keeps_parameter_markers() {
        let src = "\\newcommand{\\pair}[2]{(#1, #2) et demi}";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content().contains("#1")));
        assert!(segments
            .iter()
            .any(|s| s.is_text() && s.content().contains("et demi")));
    }

    #[test]
    fn textbf_argument_is_translatable() {
        let src = "See \\textbf{bold words} now.";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments
            .iter()
            .any(|s| s.is_text() && s.content() == "bold words"));
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == "\\textbf"));
    }

    #[test]
    fn comments_are_translatable_prose() {
        let src = "% une remarque\nDu texte.";
        let segments = segment_latex(src);
        assert_eq!(reconstruct(&segments), src);
        assert!(segments
            .iter()
            .any(|s| s.is_text() && s.content() == "une remarque"));
    }

    #[test]
    fn dangling_end_document_is_opaque() {
        assert!(placeholder_only("\\end{document}", ChunkType::LaTeX));
    }

    #[test]
    fn begin_end_document_pair_is_opaque() {
        assert!(placeholder_only(
            "\\begin{document}\\end{document}",
            ChunkType::LaTeX
        ));
    }
}
