/*! MyST / Markdown segmenter.

Colon and backtick fences are pre-scanned line-wise so that directives can
dispatch on their brace tag: pure-code fences stay opaque, admonition-style
directives keep their fence syntax opaque but recurse into title and body,
figure-like directives keep arguments and `:option:` lines opaque but recurse
into caption prose. Everything between fences goes through a commonmark token
walk that re-emits markup as placeholders and inline prose as text.
!*/
use std::collections::HashSet;

use lazy_static::lazy_static;
use pulldown_cmark::{Alignment, Event, Options, Parser, Tag, TagEnd};

use super::{Segment, Segments};

lazy_static! {
    /// Directive tags whose body is code or math, never prose.
    static ref CODE_FENCE_TAGS: HashSet<&'static str> =
        ["code-cell", "code", "code-block", "math", "eval-rst", "raw"]
            .into_iter()
            .collect();

    /// Directive tags whose argument line is opaque but whose body is prose.
    static ref FIGURE_FENCE_TAGS: HashSet<&'static str> =
        ["figure", "image", "include", "literalinclude"].into_iter().collect();
}

/// Segment a MyST chunk.
pub fn segment_myst(source: &str) -> Vec<Segment> {
    let mut segments = Segments::new();
    segment_into(source, &mut segments);
    segments.into_vec()
}

fn segment_into(source: &str, out: &mut Segments) {
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    let mut cursor = 0;
    let mut prose_start = 0;
    while cursor < lines.len() {
        match fence_at(&lines, cursor) {
            Some(fence) => {
                let prose: String = lines[prose_start..cursor].concat();
                render_markdown(&prose, out);
                emit_fence(&lines, &fence, out);
                cursor = fence.close_line.map(|c| c + 1).unwrap_or(lines.len());
                prose_start = cursor;
            }
            None => cursor += 1,
        }
    }
    let prose: String = lines[prose_start..].concat();
    render_markdown(&prose, out);
}

struct FenceBlock {
    open_line: usize,
    /// index of the closing fence line, None when unterminated
    close_line: Option<usize>,
    marker: char,
    /// directive tag without braces (`note`, `code-cell`, …), if any
    tag: Option<String>,
    /// rest of the info string after the tag
    argument: String,
}

fn fence_at(lines: &[&str], at: usize) -> Option<FenceBlock> {
    let line = lines[at];
    let trimmed = line.trim_start();
    let marker = match trimmed.chars().next() {
        Some(c @ ('`' | ':')) => c,
        _ => return None,
    };
    let run = trimmed.chars().take_while(|&c| c == marker).count();
    if run < 3 {
        return None;
    }
    let info = trimmed[run..].trim_end_matches('\n').trim();

    let (tag, argument) = if let Some(rest) = info.strip_prefix('{') {
        match rest.find('}') {
            Some(close) => (
                Some(rest[..close].to_string()),
                rest[close + 1..].trim_start().to_string(),
            ),
            None => (None, info.to_string()),
        }
    } else {
        (None, info.to_string())
    };

    let close_line = (at + 1..lines.len()).find(|&i| {
        let t = lines[i].trim();
        !t.is_empty()
            && t.chars().all(|c| c == marker)
            && t.chars().count() >= run
    });

    Some(FenceBlock {
        open_line: at,
        close_line,
        marker,
        tag,
        argument,
    })
}

fn emit_fence(lines: &[&str], fence: &FenceBlock, out: &mut Segments) {
    let body_end = fence.close_line.unwrap_or(lines.len());
    let raw: String = lines[fence.open_line..=body_end.min(lines.len() - 1)]
        .concat();

    let code_like = match &fence.tag {
        Some(tag) => CODE_FENCE_TAGS.contains(tag.as_str()),
        // plain fences (``` or :::) without a brace tag are code
        None => true,
    };
    if code_like {
        out.push_placeholder(&raw);
        return;
    }

    let tag = fence.tag.as_deref().unwrap_or_default();
    let open_raw = lines[fence.open_line];
    let marker_run: String = open_raw
        .trim_start()
        .chars()
        .take_while(|&c| c == fence.marker)
        .collect();
    let indent_len = open_raw.len() - open_raw.trim_start().len();

    // `:::{tag}` prefix is syntax; the remaining argument is prose for
    // admonitions and opaque for figure-like directives.
    out.push_placeholder(&open_raw[..indent_len]);
    out.push_placeholder(&format!("{}{{{}}}", marker_run, tag));
    if !fence.argument.is_empty() {
        out.push_placeholder(" ");
        if FIGURE_FENCE_TAGS.contains(tag) {
            out.push_placeholder(&fence.argument);
        } else {
            out.push_text(&fence.argument);
        }
    }
    out.push_placeholder("\n");

    // body: leading `:key: value` option lines are opaque, the rest recurses
    let mut body_cursor = fence.open_line + 1;
    while body_cursor < body_end {
        let line = lines[body_cursor];
        let t = line.trim_start();
        if t.starts_with(':') && !t.starts_with(":::") {
            out.push_placeholder(line);
            body_cursor += 1;
        } else {
            break;
        }
    }
    let body: String = lines[body_cursor..body_end].concat();
    segment_into(&body, out);

    if fence.close_line.is_some() {
        out.push_placeholder(lines[body_end]);
    }
}

/// Token walk over fence-free markdown.
fn render_markdown(source: &str, out: &mut Segments) {
    if source.trim().is_empty() {
        out.push_placeholder(source);
        return;
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);

    let events: Vec<(Event, std::ops::Range<usize>)> =
        Parser::new_ext(source, options).into_offset_iter().collect();

    let mut renderer = Renderer {
        source,
        out,
        list_stack: Vec::new(),
        link_stack: Vec::new(),
        alignments: Vec::new(),
        at_start: true,
    };
    let mut idx = 0;
    while idx < events.len() {
        idx = renderer.render_event(&events, idx);
    }
}

struct Renderer<'a, 'o> {
    source: &'a str,
    out: &'o mut Segments,
    /// ordered-list counters; None for bullet lists
    list_stack: Vec<Option<u64>>,
    link_stack: Vec<String>,
    alignments: Vec<Alignment>,
    at_start: bool,
}

impl<'a, 'o> Renderer<'a, 'o> {
    fn ph(&mut self, s: &str) {
        self.out.push_placeholder(s);
        self.at_start = false;
    }

    fn text(&mut self, s: &str) {
        self.out.push_text(s);
        self.at_start = false;
    }

    fn item_indent(&self) -> String {
        "\t".repeat(self.list_stack.len().saturating_sub(1))
    }

    /// Render the event at `idx`, returning the index of the next unrendered
    /// event.
    fn render_event(
        &mut self,
        events: &[(Event, std::ops::Range<usize>)],
        idx: usize,
    ) -> usize {
        let (event, range) = &events[idx];
        match event {
            Event::Start(Tag::Paragraph) => {
                if !self.at_start {
                    self.ph("\n");
                }
            }
            Event::End(TagEnd::Paragraph) => self.ph("\n"),
            Event::Start(Tag::Heading { level, .. }) => {
                if !self.at_start {
                    self.ph("\n");
                }
                self.ph(&format!("{} ", "#".repeat(*level as usize)));
            }
            Event::End(TagEnd::Heading(_)) => self.ph("\n"),
            Event::Start(Tag::List(start)) => {
                // a nested list starts on its own line
                if !self.list_stack.is_empty() {
                    self.ph("\n");
                }
                self.list_stack.push(*start);
            }
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.ph("\n");
                }
            }
            Event::Start(Tag::Item) => {
                let indent = self.item_indent();
                let marker = match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.ph(&format!("{}{}", indent, marker));
            }
            Event::End(TagEnd::Item) => self.ph("\n"),
            Event::TaskListMarker(checked) => {
                self.ph(if *checked { "[x] " } else { "[ ] " })
            }
            Event::Start(Tag::BlockQuote { .. }) => self.ph("> "),
            Event::Start(Tag::CodeBlock(_)) => {
                // indented code blocks survive byte-exact via the source span
                let raw = self.source[range.clone()].to_string();
                self.ph(&raw);
                let mut skip = idx + 1;
                while skip < events.len()
                    && !matches!(events[skip].0, Event::End(TagEnd::CodeBlock))
                {
                    skip += 1;
                }
                return skip + 1;
            }
            Event::Start(Tag::MetadataBlock(_)) => {
                let raw = self.source[range.clone()].to_string();
                self.ph(&raw);
                let mut skip = idx + 1;
                while skip < events.len()
                    && !matches!(events[skip].0, Event::End(TagEnd::MetadataBlock(_)))
                {
                    skip += 1;
                }
                return skip + 1;
            }
            Event::Start(Tag::Emphasis) => self.ph("*"),
            Event::End(TagEnd::Emphasis) => self.ph("*"),
            Event::Start(Tag::Strong) => self.ph("**"),
            Event::End(TagEnd::Strong) => self.ph("**"),
            Event::Start(Tag::Strikethrough) => self.ph("~~"),
            Event::End(TagEnd::Strikethrough) => self.ph("~~"),
            Event::Start(Tag::Link { dest_url, .. }) => {
                self.link_stack.push(dest_url.to_string());
                self.ph("[");
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                self.link_stack.push(dest_url.to_string());
                self.ph("![");
            }
            Event::End(TagEnd::Link) | Event::End(TagEnd::Image) => {
                if let Some(dest) = self.link_stack.pop() {
                    self.ph(&format!("]({})", dest));
                }
            }
            Event::Start(Tag::FootnoteDefinition(label)) => {
                self.ph(&format!("[^{}]: ", label));
            }
            Event::End(TagEnd::FootnoteDefinition) => {}
            Event::FootnoteReference(label) => self.ph(&format!("[^{}]", label)),
            Event::Start(Tag::Table(alignments)) => {
                self.alignments = alignments.clone();
                if !self.at_start {
                    self.ph("\n");
                }
            }
            Event::End(TagEnd::Table) => self.ph("\n"),
            Event::Start(Tag::TableHead) => {
                self.ph("|");
            }
            Event::End(TagEnd::TableHead) => {
                self.ph("\n");
                let markers: Vec<&str> = self
                    .alignments
                    .iter()
                    .map(|a| match a {
                        Alignment::Left => ":---",
                        Alignment::Center => ":---:",
                        Alignment::Right => "---:",
                        Alignment::None => "---",
                    })
                    .collect();
                self.ph(&format!("|{}|\n", markers.join("|")));
            }
            Event::Start(Tag::TableRow) => self.ph("|"),
            Event::End(TagEnd::TableRow) => self.ph("\n"),
            Event::Start(Tag::TableCell) => {}
            Event::End(TagEnd::TableCell) => self.ph("|"),
            Event::Start(Tag::HtmlBlock) | Event::End(TagEnd::HtmlBlock) => {}
            Event::Text(t) => self.text(t),
            Event::Code(code) => self.ph(&format!("`{}`", code)),
            Event::InlineMath(math) => self.ph(&format!("${}$", math)),
            Event::DisplayMath(math) => self.ph(&format!("$${}$$", math)),
            Event::Html(html) | Event::InlineHtml(html) => self.ph(html),
            Event::SoftBreak => {
                let indent = if self.list_stack.is_empty() {
                    String::new()
                } else {
                    "\t".repeat(self.list_stack.len())
                };
                self.ph(&format!("\n{}", indent));
            }
            Event::HardBreak => self.ph("\n"),
            Event::Rule => self.ph("---\n"),
            _ => {}
        }
        idx + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{placeholder_only, ChunkType};

    fn reconstruct(segments: &[Segment]) -> String {
        segments.iter().map(Segment::content).collect()
    }

    fn texts(segments: &[Segment]) -> Vec<String> {
        segments
            .iter()
            .filter(|s| s.is_text())
            .map(|s| s.content().to_string())
            .collect()
    }

    #[test]
    fn code_cell_fence_is_placeholder_only() {
        let chunk = "```{code-cell} python3\nprint('Hello')\n```\n";
        assert!(placeholder_only(chunk, ChunkType::MystBlock));
        assert_eq!(reconstruct(&segment_myst(chunk)), chunk);
    }

    #[test]
    fn plain_code_fence_is_placeholder_only() {
        let chunk = "```python\nx = 1\n```\n";
        assert!(placeholder_only(chunk, ChunkType::MystBlock));
    }

    #[test]
    fn heading_prefix_is_opaque() {
        let segments = segment_myst("## Premiers calculs\n");
        assert_eq!(texts(&segments), vec!["Premiers calculs"]);
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == "## "));
    }

    #[test]
    fn admonition_title_and_body_are_translated() {
        let chunk = ":::{admonition} Une note\nRestez hydratés.\n:::\n";
        let segments = segment_myst(chunk);
        let texts = texts(&segments);
        assert!(texts.iter().any(|t| t.contains("Une note")));
        assert!(texts.iter().any(|t| t.contains("Restez hydratés.")));
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == ":::{admonition}"));
    }

    #[test]
    fn math_fence_is_opaque() {
        let chunk = "```{math}\na^2 + b^2 = c^2\n```\n";
        assert!(placeholder_only(chunk, ChunkType::MystBlock));
    }

    #[test]
    fn figure_arguments_stay_opaque_but_caption_translates() {
        let chunk = ":::{figure} images/chat.png\n:width: 200px\nUn chat qui dort.\n:::\n";
        let segments = segment_myst(chunk);
        let texts = texts(&segments);
        assert!(texts.iter().any(|t| t.contains("Un chat qui dort.")));
        assert!(texts.iter().all(|t| !t.contains("images/chat.png")));
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content().contains(":width: 200px")));
    }

    #[test]
    fn inline_markup_is_opaque() {
        let chunk = "Voir [la suite](chapitre2.md) et la formule $E = mc^2$.\n";
        let segments = segment_myst(chunk);
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == "](chapitre2.md)"));
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == "$E = mc^2$"));
        let texts = texts(&segments);
        assert!(texts.iter().any(|t| t.contains("Voir ")));
    }

    #[test]
    fn footnote_reference_is_opaque() {
        let segments = segment_myst("Un fait établi[^source].\n");
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content() == "[^source]"));
    }

    #[test]
    fn table_rows_translate_cell_by_cell() {
        let chunk = "| Nom | Sens |\n|:---|---:|\n| chat | animal |\n";
        let segments = segment_myst(chunk);
        let texts = texts(&segments);
        assert!(texts.contains(&"chat".to_string()));
        assert!(texts.contains(&"animal".to_string()));
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content().contains(":---")));
        assert!(segments
            .iter()
            .any(|s| !s.is_text() && s.content().contains("---:")));
    }

    #[test]
    fn nested_lists_use_tab_indentation() {
        let chunk = "- dehors\n  1. dedans\n";
        let segments = segment_myst(chunk);
        let reconstructed = reconstruct(&segments);
        assert!(reconstructed.contains("- dehors"));
        assert!(reconstructed.contains("\t1. dedans"));
    }

    #[test]
    fn whitespace_only_chunk_is_placeholder_only() {
        assert!(placeholder_only("\n\n", ChunkType::MystBlock));
    }

    #[test]
    fn unterminated_fence_stays_opaque() {
        let chunk = "```python\nx = 1\n";
        assert!(placeholder_only(chunk, ChunkType::MystBlock));
        assert_eq!(reconstruct(&segment_myst(chunk)), chunk);
    }
}
