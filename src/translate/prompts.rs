/*! Prompt templates and macro substitution.

Templates carry bracketed macros (`[TARGET_LANGUAGE]`, `[CONTENT_TYPE]`, …)
that are substituted before the chunk is attached. The model's reply is
scanned for `<output>…</output>` spans; everything else it says is dropped.
!*/
use crate::lang::Lang;
use crate::vocab::VocabList;

/// Generic prompt for documents translated without the XML envelope.
pub const PLAIN_PROMPT: &str = r#"You are a specialized translation assistant proficient in handling various document formats (LaTeX, Markdown, MyST, Jupyter notebooks and plain text).
Your task is to translate only the natural language content into [TARGET_LANGUAGE], while preserving the input exactly as-is, including syntax, layout, and errors.

Treat the input as a raw source file, not as a renderable document. Do not alter or correct formatting, layout, or syntax in any way. Do not translate code blocks, inline code, mathematical expressions, directive syntax, file paths, URLs or identifiers. Translate every sentence, caption and command argument written in the source natural language, including short connecting words.

Optionally you receive a custom vocabulary of preferred translations, one [SOURCE_TERM]=[TARGET_TERM] pair per line. A pair [TERM]=[TERM] means the term must stay untranslated.

<custom_vocabulary>
[CUSTOM_VOCABULARY]
</custom_vocabulary>

Output requirements:
- Return only the translated content inside a single, all-encompassing tag: <output> ... </output>.
- Do not wrap the output in triple backticks and do not add language tags.
- The output must be raw, line-accurate and byte-faithful.
- If the document is already written in [TARGET_LANGUAGE], return it unchanged inside <output>.
- If the document is empty, return an empty <output></output>.

The document to translate is wrapped in a <document> tag below.
"#;

/// Prompt for chunks presented through the XML envelope.
pub const XML_PROMPT: &str = r#"You are tasked with translating scientific text from [SOURCE_LANGUAGE] to [TARGET_LANGUAGE] using a structured XML format.

The document is composed of <TEXT> elements that contain the translatable content (sentences or paragraphs), interleaved with <PH> tags for non-translatable content such as [CONTENT_TYPE].

Instructions:
- Translate only the content inside <TEXT> tags, excluding anything inside <PH> tags.
- Do not remove or modify any <PH/> tags or their attributes.
- Use the original attribute of each <PH/> tag to understand context and grammar (plurality, case, syntax), but never change or translate the attribute itself.
- Treat each <TEXT> block as a complete sentence or paragraph. You may reorder words and apply natural grammar in the target language as long as every <PH> tag stays in place, unchanged.
- All <PH> tags must stay self-closing, in the form <PH id="..." original="..."/>. Never produce </PH> closing tags and never place content inside a <PH> element.
- If the chunk contains no <PH> tags, simply translate the text inside <TEXT> and return it in the same format.

You may also receive a custom vocabulary of preferred translations, one [SOURCE_TERM]=[TARGET_TERM] pair per line; [TERM]=[TERM] means the term stays untranslated.

<custom_vocabulary>
[CUSTOM_VOCABULARY]
</custom_vocabulary>

Output format:
<output>
<document>
<TEXT>
  ...translated text with embedded <PH id="..." original="..."/> tags...
</TEXT>
</document>
</output>

Do not cover the output in Markdown fences.

The document is provided below:
[SRC]
"#;

/// XML prompt variant carrying a previously translated similar chunk.
pub const XML_WITH_EXAMPLE_PROMPT: &str = r#"You are tasked with updating the translation of a scientific document from [SOURCE_LANGUAGE] to [TARGET_LANGUAGE] using a structured XML format.

The document consists of <TEXT> elements with translatable content, interleaved with <PH> tags for non-translatable content such as [CONTENT_TYPE].

You are provided with:
1. An original source paragraph (in [SOURCE_LANGUAGE]).
2. Its correct translation (in [TARGET_LANGUAGE]).
3. A new version of the source paragraph, differing only slightly.

Your task:
- Update the translation to reflect the changes in the new source.
- Reuse as much as possible from the existing translation.
- Keep the XML structure unchanged, including every <PH> tag and its attributes.
- All <PH> tags must stay self-closing, in the form <PH id="..." original="..."/>.

You may also receive a custom vocabulary of preferred translations, one [SOURCE_TERM]=[TARGET_TERM] pair per line; [TERM]=[TERM] means the term stays untranslated.

<custom_vocabulary>
[CUSTOM_VOCABULARY]
</custom_vocabulary>

Output format:
<output>
<document>
<TEXT>
  ...translated text with embedded <PH id="..." original="..."/> tags...
</TEXT>
</document>
</output>

Do not cover the output in Markdown fences.

Old source:
[OLD_SRC]

Old translation:
[OLD_TGT]

New source:
[SRC]

Now provide the updated translation:
"#;

pub fn for_languages(template: &str, tgt: Lang, src: Option<Lang>) -> String {
    let mut prompt = template.to_string();
    if let Some(src) = src {
        prompt = prompt.replace("[SOURCE_LANGUAGE]", src.name());
    }
    prompt.replace("[TARGET_LANGUAGE]", tgt.name())
}

pub fn for_content_type(template: &str, content_type: &str) -> String {
    template.replace("[CONTENT_TYPE]", content_type)
}

pub fn for_vocabulary(template: &str, vocab: Option<&VocabList>) -> String {
    let compiled = vocab.map(VocabList::compile).unwrap_or_default();
    template.replace("[CUSTOM_VOCABULARY]", &compiled)
}

pub fn for_example(template: &str, src_example: &str, tgt_example: &str) -> String {
    template
        .replace("[OLD_SRC]", src_example)
        .replace("[OLD_TGT]", tgt_example)
}

/// Attach the chunk to a plain prompt.
pub fn finalize_plain(prompt: &str, contents: &str) -> String {
    format!("{}\n<document>\n{}\n</document>", prompt, contents)
}

/// Attach the enveloped chunk to an XML prompt.
pub fn finalize_xml(prompt: &str, xml_chunk: &str) -> String {
    prompt.replace("[SRC]", xml_chunk)
}

/// Concatenate the contents of every `<output>…</output>` span, stripping
/// one leading newline from each. An unterminated final span runs to the end
/// of the reply. No tag at all yields the empty string, the caller's signal
/// that translation failed.
pub fn extract_output(message: &str) -> String {
    const OPEN: &str = "<output>";
    const CLOSE: &str = "</output>";

    let mut out = String::new();
    let mut cursor = 0;
    let mut found = false;
    while let Some(start) = message[cursor..].find(OPEN) {
        found = true;
        let content_start = cursor + start + OPEN.len();
        let (segment, next) = match message[content_start..].find(CLOSE) {
            Some(end) => (
                &message[content_start..content_start + end],
                content_start + end + CLOSE.len(),
            ),
            None => (&message[content_start..], message.len()),
        };
        out.push_str(segment.strip_prefix('\n').unwrap_or(segment));
        cursor = next;
    }
    if !found {
        return String::new();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_are_substituted() {
        let prompt = for_languages("[SOURCE_LANGUAGE] -> [TARGET_LANGUAGE]", Lang::French, Some(Lang::English));
        assert_eq!(prompt, "English -> French");

        let prompt = for_content_type("non-translatable [CONTENT_TYPE] syntax", "LaTeX");
        assert_eq!(prompt, "non-translatable LaTeX syntax");
    }

    #[test]
    fn vocabulary_defaults_to_empty() {
        assert_eq!(for_vocabulary("<v>[CUSTOM_VOCABULARY]</v>", None), "<v></v>");
        let vocab = VocabList::new(vec![("a".into(), "b".into())]);
        assert_eq!(
            for_vocabulary("<v>[CUSTOM_VOCABULARY]</v>", Some(&vocab)),
            "<v>a=b\n</v>"
        );
    }

    #[test]
    fn extract_single_output_span() {
        assert_eq!(extract_output("noise <output>OK</output> trailing"), "OK");
        assert_eq!(extract_output("<output>\nOK</output>"), "OK");
    }

    #[test]
    fn extract_concatenates_multiple_spans() {
        assert_eq!(
            extract_output("<output>a</output> chat <output>b</output>"),
            "ab"
        );
    }

    #[test]
    fn extract_unterminated_span_runs_to_end() {
        assert_eq!(extract_output("<output>partial answer"), "partial answer");
    }

    #[test]
    fn extract_without_tag_is_empty() {
        assert_eq!(extract_output("I refuse to answer in the format."), "");
        assert_eq!(extract_output(""), "");
    }
}
