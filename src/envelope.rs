/*! XML envelope for model round trips.

A segment stream becomes `<document><TEXT>…</TEXT></document>` where
translatable text is character data and every placeholder is a self-closing
`<PH id="k" original="…"/>`. Reconstruction is driven solely by the
`original` attribute, which makes the round trip robust against a model that
renumbers, drops or reorders placeholders: whatever survived is substituted,
the rest degrades gracefully instead of crashing.
!*/
use log::warn;
use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::chunking::Segment;

/// Merge whitespace-only placeholders into the adjacent placeholder.
/// Non-whitespace placeholders stay distinct so alignment separators and
/// punctuation remain individually addressable.
fn coalesce(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match (&segment, merged.last_mut()) {
            (Segment::Placeholder(incoming), Some(Segment::Placeholder(last)))
                if incoming.trim().is_empty() || last.trim().is_empty() =>
            {
                last.push_str(incoming);
            }
            _ => merged.push(segment),
        }
    }
    merged
}

/// Render a segment stream into the envelope.
///
/// Returns `(xml, placeholder_count, placeholder_only)`.
pub fn to_xml(segments: Vec<Segment>) -> (String, usize, bool) {
    let segments = coalesce(segments);
    let ph_only = !segments.iter().any(Segment::is_text);

    let mut xml = String::from("<document><TEXT>");
    let mut ph_count = 0usize;
    for segment in &segments {
        match segment {
            Segment::Text(text) => xml.push_str(&escape(text.as_str())),
            Segment::Placeholder(content) => {
                ph_count += 1;
                xml.push_str(&format!(
                    "<PH id=\"{}\" original=\"{}\"/>",
                    ph_count,
                    escape(content.as_str())
                ));
            }
        }
    }
    xml.push_str("</TEXT></document>");
    (xml, ph_count, ph_only)
}

/// Rebuild the chunk text from a (possibly model-mangled) envelope.
///
/// Missing `original` attributes and unknown child tags are skipped with a
/// warning; an absent `TEXT` element yields the empty string. Parse errors
/// end reconstruction with whatever was recovered so far.
pub fn from_xml(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);

    let mut out = String::new();
    let mut in_text = false;
    let mut saw_text_element = false;
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if skip_depth > 0 {
                    skip_depth += 1;
                    continue;
                }
                match name.as_slice() {
                    b"TEXT" => {
                        in_text = true;
                        saw_text_element = true;
                    }
                    b"document" => {}
                    b"PH" if in_text => {
                        // model produced a non-self-closing PH; honor its
                        // original attribute and drop any inner content
                        push_original(&e, &mut out);
                        skip_depth += 1;
                    }
                    other => {
                        if in_text {
                            warn!(
                                "skipping unknown element <{}> in envelope",
                                String::from_utf8_lossy(other)
                            );
                            skip_depth += 1;
                        }
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if skip_depth > 0 || !in_text {
                    continue;
                }
                if e.name().as_ref() == b"PH" {
                    push_original(&e, &mut out);
                } else {
                    warn!(
                        "skipping unknown element <{}/> in envelope",
                        String::from_utf8_lossy(e.name().as_ref())
                    );
                }
            }
            Ok(Event::End(e)) => {
                if skip_depth > 0 {
                    skip_depth -= 1;
                    continue;
                }
                if e.name().as_ref() == b"TEXT" {
                    in_text = false;
                }
            }
            Ok(Event::Text(t)) => {
                if in_text && skip_depth == 0 {
                    match t.unescape() {
                        Ok(text) => out.push_str(&text),
                        Err(e) => warn!("bad character data in envelope: {:?}", e),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("malformed envelope, keeping partial reconstruction: {:?}", e);
                break;
            }
        }
    }

    if !saw_text_element {
        return String::new();
    }
    out
}

fn push_original(element: &quick_xml::events::BytesStart, out: &mut String) {
    let original = element.attributes().with_checks(false).find_map(|attr| {
        attr.ok()
            .filter(|a| a.key.as_ref() == b"original")
            .map(|a| a.value.into_owned())
    });
    match original {
        Some(value) => {
            let raw = String::from_utf8_lossy(&value).into_owned();
            match unescape(&raw) {
                Ok(unescaped) => out.push_str(&unescaped),
                Err(_) => out.push_str(&raw),
            }
        }
        None => warn!("PH element without original attribute, skipping"),
    }
}
