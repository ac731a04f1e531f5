//! Table of contents field.
//!
//! Word fills a TOC field when fields are updated; until then the field shows
//! a placeholder. [`DocxEditor::mark_toc_dirty`] asks Word to refresh it on
//! open.

use std::sync::LazyLock;

use docx_splice_core::anchor::paragraphs_with_text;
use docx_splice_core::markup::{close_tag, escape, find_from, next_start_tag, unescape};
use docx_splice_core::planner::insert_fragment;
use docx_splice_core::{InsertPosition, SpliceError, DOCUMENT_PART};
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::document;

static LEVEL_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([1-9])-([1-9])$").expect("static level pattern is valid"));
static TOC_STYLE: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r#"<w:pStyle\s+w:val\s*=\s*["']TOC([1-9])["']"#).expect("static style pattern is valid")
});
static FIELD_BEGIN: LazyLock<BytesRegex> = LazyLock::new(|| {
    BytesRegex::new(r#"<w:fldChar\b[^>]*?w:fldCharType\s*=\s*["']begin["'][^>]*>"#).expect("static field pattern is valid")
});

const INSTRUCTION: &str = "w:instrText";
const PLACEHOLDER: &str = "Update this field to show Table of Contents";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TocOptions {
    /// Heading paragraph above the field; `None` for no heading.
    pub title: Option<String>,
    /// Outline levels for the `\o` switch, e.g. `1-3`.
    pub levels: String,
    pub position: InsertPosition,
}

impl Default for TocOptions {
    fn default() -> Self {
        Self {
            title: Some("Table of Contents".to_string()),
            levels: "1-3".to_string(),
            position: InsertPosition::Beginning,
        }
    }
}

impl TocOptions {
    fn validate(&self) -> Result<()> {
        let caps = LEVEL_RANGE
            .captures(&self.levels)
            .ok_or_else(|| DocxError::invalid(format!("TOC levels {:?} must look like 1-3", self.levels)))?;
        if caps[1] > caps[2] {
            return Err(DocxError::invalid(format!("TOC levels {:?} are reversed", self.levels)));
        }
        Ok(())
    }

    fn to_xml(&self) -> String {
        let mut xml = String::new();
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            xml.push_str(&format!(
                concat!(
                    r#"<w:p><w:pPr><w:pStyle w:val="TOCHeading"/><w:jc w:val="center"/></w:pPr>"#,
                    r#"<w:r><w:rPr><w:b/><w:sz w:val="44"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#
                ),
                escape(title)
            ));
        }
        let instruction = format!(r#" TOC \o "{}" \h \z \u "#, self.levels);
        xml.push_str(&format!(
            concat!(
                r#"<w:p><w:pPr/><w:r><w:fldChar w:fldCharType="begin"/></w:r>"#,
                r#"<w:r><w:instrText xml:space="preserve">{instr}</w:instrText></w:r>"#,
                r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r>"#,
                r#"<w:r><w:rPr><w:i/></w:rPr><w:t>{placeholder}</w:t></w:r>"#,
                r#"<w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#
            ),
            instr = escape(&instruction),
            placeholder = PLACEHOLDER,
        ));
        xml
    }
}

/// A rendered TOC line, read from a `TOCn` styled paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
}

/// Offsets where ` w:dirty="true"` goes: inside the begin `fldChar` of every
/// TOC field not already flagged.
fn dirty_flag_offsets(doc: &[u8]) -> docx_splice_core::Result<Vec<usize>> {
    let close = close_tag(INSTRUCTION);
    let mut offsets = Vec::new();
    let mut cursor = 0;
    while let Some(open) = next_start_tag(doc, INSTRUCTION, cursor)? {
        if open.self_closing {
            cursor = open.end;
            continue;
        }
        let end = find_from(doc, &close, open.end)
            .ok_or_else(|| SpliceError::malformed("<w:instrText> is never closed"))?;
        cursor = end;
        let instruction = String::from_utf8_lossy(&doc[open.end..end]);
        if !unescape(&instruction).trim_start().starts_with("TOC") {
            continue;
        }
        let Some(begin) = FIELD_BEGIN.find_iter(&doc[..open.start]).last() else {
            continue;
        };
        let tag = begin.as_bytes();
        if docx_splice_core::markup::contains(tag, b"w:dirty") {
            continue;
        }
        let at = if tag.ends_with(b"/>") { begin.end() - 2 } else { begin.end() - 1 };
        if !offsets.contains(&at) {
            offsets.push(at);
        }
    }
    Ok(offsets)
}

impl DocxEditor {
    #[instrument(level = "debug", skip(self, options), fields(levels = %options.levels))]
    pub fn insert_toc(&mut self, options: TocOptions) -> Result<()> {
        options.validate()?;
        let fragment = options.to_xml();
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = insert_fragment(&doc, &options.position, fragment.as_bytes()).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Inserted TOC for levels {} at {:?}", options.levels, options.position);
        Ok(())
    }

    /// Flag every TOC field so Word rebuilds it when the document opens.
    /// Returns the number of fields newly flagged.
    #[instrument(level = "debug", skip(self))]
    pub fn mark_toc_dirty(&mut self) -> Result<usize> {
        let flagged = self.edit(|tx| {
            let mut doc = document(tx)?;
            let offsets = dirty_flag_offsets(&doc).in_part(DOCUMENT_PART)?;
            if offsets.is_empty() {
                debug!("No TOC field needs flagging");
                return Ok(0);
            }
            for &at in offsets.iter().rev() {
                doc.splice(at..at, br#" w:dirty="true""#.iter().copied());
            }
            tx.put(DOCUMENT_PART, doc);
            Ok(offsets.len())
        })?;
        info!("Flagged {} TOC fields for update", flagged);
        Ok(flagged)
    }

    /// Entries of an already rendered TOC.
    pub fn toc_entries(&self) -> Result<Vec<TocEntry>> {
        let doc = self.document()?;
        let paragraphs = paragraphs_with_text(doc).in_part(DOCUMENT_PART)?;
        Ok(paragraphs
            .into_iter()
            .filter_map(|(span, text)| {
                let caps = TOC_STYLE.captures(span.slice(doc))?;
                let level = caps[1][0] - b'0';
                let text = text.trim().to_string();
                (!text.is_empty()).then_some(TocEntry { level, text })
            })
            .collect())
    }
}
