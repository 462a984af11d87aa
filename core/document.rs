//! The packed document format.
//!
//! ```text
//! <optional prompt>
//!
//! <repository_context>
//! <file_tree>
//! ...
//! </file_tree>
//! <file path="src/main.rs">
//! <![CDATA[
//! ...
//! ]]>
//! </file>
//! </repository_context>
//! ```
//!
//! File bodies sit in CDATA sections. A literal `]]>` inside a body is split
//! across two sections (`]]]]><![CDATA[>`), so any CDATA-aware reader that
//! concatenates adjacent sections recovers the exact original text.

use crate::error::{AppError, Result};
use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::Event;
use serde::Serialize;

pub const ROOT_TAG: &str = "repository_context";
pub const TREE_TAG: &str = "file_tree";
pub const FILE_TAG: &str = "file";

const PROMPT_SEPARATOR: &str = "\n\n";
const CDATA_END: &str = "]]>";
const CDATA_END_SPLIT: &str = "]]]]><![CDATA[>";

pub fn escape_cdata(content: &str) -> String {
    content.replace(CDATA_END, CDATA_END_SPLIT)
}

/// Streams document pieces into a single string.
#[derive(Debug, Default)]
pub struct DocumentWriter {
    out: String,
}

impl DocumentWriter {
    pub fn new(prompt: Option<&str>) -> Self {
        let mut out = String::new();
        if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
            out.push_str(prompt);
            out.push_str(PROMPT_SEPARATOR);
        }
        out.push_str(&format!("<{}>\n", ROOT_TAG));
        Self { out }
    }

    pub fn tree(&mut self, rendered: &str) {
        self.out.push_str(&format!(
            "<{tag}>\n{}\n</{tag}>\n",
            partial_escape(rendered),
            tag = TREE_TAG
        ));
    }

    pub fn file(&mut self, path: &str, content: &str) {
        self.out.push_str(&format!(
            "<{tag} path=\"{}\">\n<![CDATA[\n{}\n]]>\n</{tag}>\n",
            escape(path),
            escape_cdata(content),
            tag = FILE_TAG
        ));
    }

    pub fn finish(mut self) -> String {
        self.out.push_str(&format!("</{}>", ROOT_TAG));
        self.out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackedFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree: Option<String>,
    pub files: Vec<PackedFile>,
}

/// Splits off the prompt at the first place the root element opens on its own
/// line after a blank line, so a prompt that mentions the tag stays whole.
fn split_prompt(text: &str) -> Option<(Option<&str>, &str)> {
    let open_line = format!("<{}>\n", ROOT_TAG);
    if text.starts_with(&open_line) {
        return Some((None, text));
    }
    let marker = format!("{}{}", PROMPT_SEPARATOR, open_line);
    let at = text.find(&marker)?;
    Some((Some(&text[..at]), &text[at + PROMPT_SEPARATOR.len()..]))
}

/// Reads a packed document back into its parts.
pub fn parse_document(text: &str) -> Result<ParsedDocument> {
    let (prompt, body) = split_prompt(text).ok_or_else(|| {
        AppError::XmlParse(format!("missing <{}> root element", ROOT_TAG))
    })?;

    let mut parsed = ParsedDocument {
        prompt: prompt.map(str::to_string),
        ..ParsedDocument::default()
    };

    let mut reader = Reader::from_str(body);
    let mut current_path: Option<String> = None;
    let mut body = String::new();
    let mut in_tree = false;
    let mut tree = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"file" => {
                    let attr = e.try_get_attribute("path")?.ok_or_else(|| {
                        AppError::XmlParse("file record without a path attribute".to_string())
                    })?;
                    current_path = Some(attr.unescape_value()?.into_owned());
                    body.clear();
                }
                b"file_tree" => {
                    in_tree = true;
                    tree.clear();
                }
                _ => {}
            },
            Event::CData(e) => {
                if current_path.is_some() {
                    body.push_str(std::str::from_utf8(&e)?);
                }
            }
            Event::Text(e) => {
                if in_tree {
                    tree.push_str(&e.unescape()?);
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"file" => {
                    if let Some(path) = current_path.take() {
                        let inner = body.strip_prefix('\n').unwrap_or(&body);
                        let content = inner.strip_suffix('\n').unwrap_or(inner);
                        parsed.files.push(PackedFile {
                            path,
                            content: content.to_string(),
                        });
                    }
                }
                b"file_tree" => {
                    in_tree = false;
                    let trimmed = tree.strip_prefix('\n').unwrap_or(&tree).trim_end_matches('\n');
                    parsed.tree = Some(trimmed.to_string());
                }
                b"repository_context" => break,
                _ => {}
            },
            Event::Eof => {
                return Err(AppError::XmlParse(format!(
                    "document ended before </{}>",
                    ROOT_TAG
                )));
            }
            _ => {}
        }
    }
    log::debug!("Parsed {} file records from document.", parsed.files.len());
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_file_doc(path: &str, content: &str) -> String {
        let mut writer = DocumentWriter::new(None);
        writer.file(path, content);
        writer.finish()
    }

    #[test]
    fn record_layout_matches_format() {
        let doc = single_file_doc("src/a.rs", "fn a() {}");
        assert_eq!(
            doc,
            "<repository_context>\n<file path=\"src/a.rs\">\n<![CDATA[\nfn a() {}\n]]>\n</file>\n</repository_context>"
        );
    }

    #[test]
    fn terminator_inside_content_is_split() {
        assert_eq!(escape_cdata("a]]>b"), "a]]]]><![CDATA[>b");
        let doc = single_file_doc("x", "a]]>b");
        assert_eq!(doc.matches("]]>\n</file>").count(), 1);
    }

    #[test]
    fn escaped_terminators_round_trip_exactly() {
        let tricky = [
            "]]>",
            "x]]>y]]>z",
            "]]]]>>",
            "<![CDATA[ nested ]]>",
            "\n\nleading and trailing newlines\n\n",
            "",
            "crlf\r\nline\r\n",
            "unicode ünïcödé ]]> ✓",
        ];
        for content in tricky {
            let doc = single_file_doc("f.txt", content);
            let parsed = parse_document(&doc).unwrap();
            assert_eq!(parsed.files.len(), 1, "content: {:?}", content);
            assert_eq!(parsed.files[0].content, content, "content: {:?}", content);
        }
    }

    #[test]
    fn paths_with_markup_characters_are_escaped() {
        let doc = single_file_doc("a&b/\"q\"<x>.txt", "body");
        assert!(doc.contains("path=\"a&amp;b/&quot;q&quot;&lt;x&gt;.txt\""));
        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed.files[0].path, "a&b/\"q\"<x>.txt");
    }

    #[test]
    fn prompt_and_tree_are_recovered() {
        let mut writer = DocumentWriter::new(Some("Explain <this> code."));
        writer.tree("├── a&b.txt\n└── src\n    └── main.rs\n");
        writer.file("a&b.txt", "x");
        let doc = writer.finish();
        assert!(doc.starts_with("Explain <this> code.\n\n<repository_context>\n<file_tree>\n"));

        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed.prompt.as_deref(), Some("Explain <this> code."));
        assert_eq!(
            parsed.tree.as_deref(),
            Some("├── a&b.txt\n└── src\n    └── main.rs")
        );
        assert_eq!(parsed.files[0].path, "a&b.txt");
    }

    #[test]
    fn empty_prompt_is_omitted_but_whitespace_is_kept() {
        let doc = DocumentWriter::new(Some("")).finish();
        assert_eq!(doc, "<repository_context>\n</repository_context>");

        let doc = DocumentWriter::new(Some("   ")).finish();
        assert_eq!(doc, "   \n\n<repository_context>\n</repository_context>");
        assert_eq!(parse_document(&doc).unwrap().prompt.as_deref(), Some("   "));
    }

    #[test]
    fn prompt_mentioning_the_root_tag_is_read_back_whole() {
        let prompt = "Wrap output in <repository_context> tags.";
        let mut writer = DocumentWriter::new(Some(prompt));
        writer.file("a.txt", "body");
        let doc = writer.finish();

        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed.prompt.as_deref(), Some(prompt));
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].content, "body");
    }

    #[test]
    fn multi_line_prompt_keeps_its_own_newlines() {
        let prompt = "First line.\n<repository_context>\n\nLast line.\n";
        let mut writer = DocumentWriter::new(Some(prompt));
        writer.file("a.txt", "body");
        let parsed = parse_document(&writer.finish()).unwrap();
        assert_eq!(parsed.prompt.as_deref(), Some(prompt));
        assert_eq!(parsed.files[0].path, "a.txt");
    }

    #[test]
    fn missing_root_is_an_error() {
        assert!(matches!(
            parse_document("just text"),
            Err(AppError::XmlParse(_))
        ));
    }

    #[test]
    fn truncated_document_is_an_error() {
        let doc = single_file_doc("a", "b");
        let truncated = &doc[..doc.len() - "</repository_context>".len()];
        assert!(parse_document(truncated).is_err());
    }
}
