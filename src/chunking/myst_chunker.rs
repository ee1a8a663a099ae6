/*! MyST / Markdown document chunker.

Line-based block splitter: fenced blocks stay whole, YAML front matter is its
own block, everything else splits on blank lines. Blocks are then grouped
into heading-led sections; a section that grows past the size cap degrades
back to its individual blocks so single chunks stay model-sized.
!*/

/// Sections above this size are split back into their blocks.
const MAX_SECTION_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy)]
struct Block {
    /// first line index
    start: usize,
    /// one past the last line index, trailing blank lines included
    end: usize,
    is_heading: bool,
}

/// Split a MyST/Markdown document into translation chunks.
///
/// The concatenation of the returned chunks equals the source text.
pub fn split_myst_document(source: &str) -> Vec<String> {
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    let blocks = scan_blocks(&lines);

    // group blocks into sections at headings
    let mut sections: Vec<Vec<Block>> = Vec::new();
    for block in blocks {
        let start_new = block.is_heading || sections.is_empty();
        if start_new {
            sections.push(vec![block]);
        } else {
            sections.last_mut().unwrap().push(block);
        }
    }

    let mut chunks = Vec::new();
    for section in sections {
        let first = section.first().unwrap();
        let last = section.last().unwrap();
        let content: String = lines[first.start..last.end].concat();
        if content.len() > MAX_SECTION_CHARS {
            for block in &section {
                chunks.push(lines[block.start..block.end].concat());
            }
        } else {
            chunks.push(content);
        }
    }
    chunks.retain(|c| !c.is_empty());
    chunks
}

fn scan_blocks(lines: &[&str]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut cursor = 0;

    // YAML front matter
    if lines.first().map(|l| l.trim()) == Some("---") {
        if let Some(close) = (1..lines.len()).find(|&i| lines[i].trim() == "---") {
            blocks.push(Block {
                start: 0,
                end: close + 1,
                is_heading: false,
            });
            cursor = close + 1;
        }
    }

    while cursor < lines.len() {
        if lines[cursor].trim().is_empty() {
            // blank lines attach to the preceding block
            match blocks.last_mut() {
                Some(block) => block.end = cursor + 1,
                None => blocks.push(Block {
                    start: cursor,
                    end: cursor + 1,
                    is_heading: false,
                }),
            }
            cursor += 1;
            continue;
        }

        let start = cursor;
        let is_heading = is_atx_heading(lines[cursor]);
        let end = match fence_close(lines, cursor) {
            Some(close) => close + 1,
            None => {
                let mut line = cursor + 1;
                while line < lines.len()
                    && !lines[line].trim().is_empty()
                    && fence_open(lines[line]).is_none()
                    && !is_atx_heading(lines[line])
                {
                    line += 1;
                }
                line
            }
        };
        blocks.push(Block {
            start,
            end,
            is_heading,
        });
        cursor = end;
    }

    blocks
}

fn is_atx_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes)
        && trimmed[hashes..].starts_with(' ')
        && line.len() - line.trim_start().len() < 4
}

fn fence_open(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start();
    let marker = match trimmed.chars().next() {
        Some(c @ ('`' | ':' | '~')) => c,
        _ => return None,
    };
    let run = trimmed.chars().take_while(|&c| c == marker).count();
    (run >= 3).then_some((marker, run))
}

/// Index of the line closing a fence opened at `at`, if any.
fn fence_close(lines: &[&str], at: usize) -> Option<usize> {
    let (marker, run) = fence_open(lines[at])?;
    (at + 1..lines.len()).find(|&i| {
        let t = lines[i].trim();
        !t.is_empty() && t.chars().all(|c| c == marker) && t.chars().count() >= run
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_concatenate_back_to_source() {
        let source = "---\ntitle: Essai\n---\n\n# Un\n\nPremier paragraphe.\n\n\
                      ```python\nx = 1\n\n\ny = 2\n```\n\n## Deux\n\nFin.\n";
        let chunks = split_myst_document(source);
        assert_eq!(chunks.concat(), source);
    }

    #[test]
    fn sections_group_under_headings() {
        let source = "# Un\n\nAlpha.\n\n# Deux\n\nBeta.\n";
        let chunks = split_myst_document(source);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# Un"));
        assert!(chunks[0].contains("Alpha."));
        assert!(chunks[1].starts_with("# Deux"));
        assert!(chunks[1].contains("Beta."));
    }

    #[test]
    fn code_fences_stay_whole() {
        let source = "Avant.\n\n```{code-cell} python3\na = 1\n\nb = 2\n```\n\nAprès.\n";
        let chunks = split_myst_document(source);
        assert_eq!(chunks.concat(), source);
        assert!(chunks
            .iter()
            .any(|c| c.contains("a = 1\n\nb = 2") && c.contains("```")));
    }

    #[test]
    fn oversized_sections_fall_back_to_blocks() {
        let paragraph = "Une phrase assez longue pour compter vraiment.\n\n";
        let source = format!("# Titre\n\n{}", paragraph.repeat(60));
        let chunks = split_myst_document(&source);
        assert!(chunks.len() > 2);
        assert_eq!(chunks.concat(), source);
    }

    #[test]
    fn front_matter_is_its_own_chunk() {
        let source = "---\ntitle: Essai\njupytext: x\n---\nTexte.\n";
        let chunks = split_myst_document(source);
        assert!(chunks[0].starts_with("---\n"));
        assert!(chunks[0].contains("title: Essai"));
        assert!(chunks[1].contains("Texte."));
    }
}
