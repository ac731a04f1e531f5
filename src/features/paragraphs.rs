//! Paragraph insertion, deletion and counting.

use docx_splice_core::anchor::paragraphs_with_text;
use docx_splice_core::namespaces::tags;
use docx_splice_core::planner::insert_fragment;
use docx_splice_core::{blocks, count_blocks, InsertPosition, Span, DOCUMENT_PART};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::{document, require_text};
use crate::xml::{self, Alignment, RunFormat};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphOptions {
    pub text: String,
    /// Paragraph style id, e.g. `Heading1`.
    pub style: Option<String>,
    pub alignment: Option<Alignment>,
    #[serde(flatten)]
    pub format: RunFormat,
    pub position: InsertPosition,
}

impl ParagraphOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: InsertPosition) -> Self {
        self.position = position;
        self
    }

    pub fn styled(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    fn to_xml(&self) -> String {
        format!(
            "<w:p>{}{}</w:p>",
            xml::paragraph_properties(self.style.as_deref(), self.alignment),
            xml::run(&self.text, &self.format)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOptions {
    pub match_case: bool,
    pub whole_word: bool,
}

impl DocxEditor {
    #[instrument(level = "debug", skip(self, options), fields(position = ?options.position))]
    pub fn insert_paragraph(&mut self, options: ParagraphOptions) -> Result<()> {
        require_text("paragraph text", &options.text)?;
        let fragment = options.to_xml();
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = insert_fragment(&doc, &options.position, fragment.as_bytes()).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Inserted paragraph at {:?}", options.position);
        Ok(())
    }

    pub fn insert_page_break(&mut self, position: InsertPosition) -> Result<()> {
        let fragment = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = insert_fragment(&doc, &position, fragment.as_bytes()).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Inserted page break at {:?}", position);
        Ok(())
    }

    /// Remove every body paragraph whose rendered text matches `text`.
    /// Paragraphs inside tables are left alone so cells keep their required
    /// paragraph. Returns the number removed.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_paragraphs(&mut self, text: &str, options: DeleteOptions) -> Result<usize> {
        require_text("text", text)?;
        let mut pattern = regex::escape(text);
        if options.whole_word {
            pattern = format!(r"\b{pattern}\b");
        }
        let matcher = RegexBuilder::new(&pattern)
            .case_insensitive(!options.match_case)
            .build()
            .map_err(|err| DocxError::invalid(format!("search pattern: {err}")))?;

        let removed = self.edit(|tx| {
            let doc = document(tx)?;
            let tables: Vec<Span> = blocks(&doc, tags::TABLE)
                .collect::<docx_splice_core::Result<_>>()
                .in_part(DOCUMENT_PART)?;
            let doomed: Vec<Span> = paragraphs_with_text(&doc)
                .in_part(DOCUMENT_PART)?
                .into_iter()
                .filter(|(span, _)| !tables.iter().any(|t| t.start <= span.start && span.end <= t.end))
                .filter(|(_, rendered)| matcher.is_match(rendered))
                .map(|(span, _)| span)
                .collect();
            if doomed.is_empty() {
                return Ok(0);
            }
            let mut updated = doc;
            for span in doomed.iter().rev() {
                updated.drain(span.range());
            }
            tx.put(DOCUMENT_PART, updated);
            Ok(doomed.len())
        })?;
        info!("Deleted {} paragraphs matching {:?}", removed, text);
        Ok(removed)
    }

    pub fn paragraph_count(&self) -> Result<usize> {
        count_blocks(self.document()?, tags::PARAGRAPH).in_part(DOCUMENT_PART)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn editor_with(texts: &[&str]) -> DocxEditor {
        let mut editor = DocxEditor::new_blank().unwrap();
        for text in texts {
            editor.insert_paragraph(ParagraphOptions::new(*text)).unwrap();
        }
        editor
    }

    #[test]
    fn paragraphs_land_in_requested_order() {
        let mut editor = editor_with(&["middle"]);
        editor
            .insert_paragraph(ParagraphOptions::new("first").at(InsertPosition::Beginning))
            .unwrap();
        editor
            .insert_paragraph(ParagraphOptions::new("after").at(InsertPosition::AfterText("middle".into())))
            .unwrap();
        let texts: Vec<String> = editor.paragraphs().unwrap().into_iter().filter(|t| !t.is_empty()).collect();
        assert_eq!(texts, ["first", "middle", "after"]);
    }

    #[test]
    fn end_insertion_stays_before_section_properties() {
        let mut editor = editor_with(&["last"]);
        let doc = std::str::from_utf8(editor.document().unwrap()).unwrap().to_string();
        if let Some(sect) = doc.rfind("<w:sectPr") {
            assert!(doc.find("last").unwrap() < sect);
        }
        editor.insert_page_break(InsertPosition::End).unwrap();
        assert!(docx_splice_core::markup::contains(editor.document().unwrap(), br#"<w:br w:type="page"/>"#));
    }

    #[test]
    fn empty_text_is_rejected() {
        let mut editor = DocxEditor::new_blank().unwrap();
        let err = editor.insert_paragraph(ParagraphOptions::new("")).unwrap_err();
        assert!(matches!(err, DocxError::InvalidOption(_)));
    }

    #[test]
    fn delete_respects_case_and_word_boundaries() {
        let mut editor = editor_with(&["Draft notes", "draftsman", "final"]);
        let removed = editor
            .delete_paragraphs("draft", DeleteOptions { match_case: true, whole_word: true })
            .unwrap();
        assert_eq!(removed, 0);

        let removed = editor
            .delete_paragraphs("draft", DeleteOptions { match_case: false, whole_word: true })
            .unwrap();
        assert_eq!(removed, 1);

        let removed = editor.delete_paragraphs("DRAFT", DeleteOptions::default()).unwrap();
        assert_eq!(removed, 1);
        let texts: Vec<String> = editor.paragraphs().unwrap().into_iter().filter(|t| !t.is_empty()).collect();
        assert_eq!(texts, ["final"]);
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let mut editor = editor_with(&["cost (USD)", "cost USD"]);
        assert_eq!(editor.delete_paragraphs("(USD)", DeleteOptions::default()).unwrap(), 1);
    }
}
