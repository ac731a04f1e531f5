//! Tracked insertions and deletions.

use chrono::{DateTime, Utc};
use docx_splice_core::planner::insert_fragment;
use docx_splice_core::{find_paragraph_range, mark_deleted, mark_inserted, InsertPosition, RevisionContext, DOCUMENT_PART};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::editor::DocxEditor;
use crate::error::{PartContext, Result};
use crate::features::{document, require_text};
use crate::xml::{self, RunFormat};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackedInsertOptions {
    pub text: String,
    pub style: Option<String>,
    #[serde(flatten)]
    pub format: RunFormat,
    pub position: InsertPosition,
    /// Defaults to the editor's author.
    pub author: Option<String>,
    /// Defaults to now.
    pub date: Option<DateTime<Utc>>,
}

impl TrackedInsertOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackedDeleteOptions {
    /// Text of the paragraph whose runs are marked deleted.
    pub anchor: String,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl TrackedDeleteOptions {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
            ..Self::default()
        }
    }
}

impl DocxEditor {
    fn revision_author(&self, requested: Option<&str>) -> String {
        requested
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(self.author())
            .to_string()
    }

    /// Insert a new paragraph recorded as an insertion by `author`.
    #[instrument(level = "debug", skip(self, options), fields(position = ?options.position))]
    pub fn insert_tracked_text(&mut self, options: TrackedInsertOptions) -> Result<()> {
        require_text("text", &options.text)?;
        let author = self.revision_author(options.author.as_deref());
        let date = options.date.unwrap_or_else(Self::now);
        let paragraph = xml::paragraph(&options.text, options.style.as_deref(), &options.format);

        self.edit(|tx| {
            let doc = document(tx)?;
            let mut ctx = RevisionContext::for_document(&doc, author.as_str(), date).in_part(DOCUMENT_PART)?;
            let marked = mark_inserted(paragraph.as_bytes(), &mut ctx).in_part(DOCUMENT_PART)?;
            let updated = insert_fragment(&doc, &options.position, &marked).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Inserted tracked paragraph by {} at {:?}", author, options.position);
        Ok(())
    }

    /// Mark the text of the first paragraph containing `options.anchor` as
    /// deleted. The text stays in the document until the revision is
    /// accepted.
    #[instrument(level = "debug", skip(self, options), fields(anchor = %options.anchor))]
    pub fn delete_tracked_text(&mut self, options: TrackedDeleteOptions) -> Result<()> {
        require_text("anchor", &options.anchor)?;
        let author = self.revision_author(options.author.as_deref());
        let date = options.date.unwrap_or_else(Self::now);

        self.edit(|tx| {
            let doc = document(tx)?;
            let found = find_paragraph_range(&doc, &options.anchor).in_part(DOCUMENT_PART)?;
            let mut ctx = RevisionContext::for_document(&doc, author.as_str(), date).in_part(DOCUMENT_PART)?;
            let marked = mark_deleted(found.paragraph.slice(&doc), &mut ctx).in_part(DOCUMENT_PART)?;
            let updated = docx_splice_core::replace_span(&doc, found.paragraph, &marked).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Marked paragraph {:?} deleted by {}", options.anchor, author);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::paragraphs::ParagraphOptions;
    use chrono::TimeZone;
    use docx_splice_core::markup::contains;
    use docx_splice_core::{next_id, IdNamespace};
    use pretty_assertions::assert_eq;

    fn fixed_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn insertion_carries_author_and_date() {
        let mut editor = DocxEditor::new_blank().unwrap().with_author("Reviewer");
        editor
            .insert_tracked_text(TrackedInsertOptions {
                date: Some(fixed_date()),
                ..TrackedInsertOptions::new("New clause")
            })
            .unwrap();
        let doc = editor.document().unwrap();
        assert!(contains(
            doc,
            br#"<w:ins w:id="2" w:author="Reviewer" w:date="2024-03-01T09:30:00Z">"#
        ));
        assert!(contains(doc, br#"<w:rPr><w:ins w:id="1" w:author="Reviewer""#));
        assert!(contains(doc, b"New clause"));
    }

    #[test]
    fn deletion_keeps_text_as_deleted_runs() {
        let mut editor = DocxEditor::new_blank().unwrap();
        editor.insert_paragraph(ParagraphOptions::new("Obsolete sentence")).unwrap();
        editor.insert_paragraph(ParagraphOptions::new("Keeper")).unwrap();
        editor
            .delete_tracked_text(TrackedDeleteOptions {
                author: Some("Editor".into()),
                ..TrackedDeleteOptions::new("Obsolete")
            })
            .unwrap();
        let doc = editor.document().unwrap();
        assert!(contains(doc, b"<w:delText xml:space=\"preserve\">Obsolete sentence</w:delText>"));
        assert!(contains(doc, br#"w:author="Editor""#));
        assert!(contains(doc, b"<w:t xml:space=\"preserve\">Keeper</w:t>"));
    }

    #[test]
    fn revision_ids_continue_across_edits() {
        let mut editor = DocxEditor::new_blank().unwrap();
        editor.insert_tracked_text(TrackedInsertOptions::new("one")).unwrap();
        editor.insert_tracked_text(TrackedInsertOptions::new("two")).unwrap();
        assert_eq!(next_id(editor.document().unwrap(), IdNamespace::Revision).unwrap(), 5);
    }

    #[test]
    fn missing_anchor_is_not_found() {
        let mut editor = DocxEditor::new_blank().unwrap();
        let err = editor.delete_tracked_text(TrackedDeleteOptions::new("absent")).unwrap_err();
        assert_eq!(err.kind(), Some(docx_splice_core::ErrorKind::NotFound));
    }
}
