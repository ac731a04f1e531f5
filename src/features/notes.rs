//! Footnotes and endnotes.

use docx_splice_core::markup::{escape, insert_before_close};
use docx_splice_core::namespaces::{content_types as ct, rel_types, OFFICE_RELATIONSHIPS, WORDML};
use docx_splice_core::{find_paragraph_range, next_id, IdNamespace, DOCUMENT_PART};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::editor::DocxEditor;
use crate::error::{PartContext, Result};
use crate::features::{document, ensure_linked_part, paragraph_content_end, require_text, LinkedPart, XML_DECLARATION};

/// Which notes part a note goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    pub fn part(self) -> &'static str {
        match self {
            NoteKind::Footnote => "word/footnotes.xml",
            NoteKind::Endnote => "word/endnotes.xml",
        }
    }

    fn linked(self) -> LinkedPart<'static> {
        match self {
            NoteKind::Footnote => LinkedPart {
                path: self.part(),
                rel_type: rel_types::FOOTNOTES,
                content_type: ct::FOOTNOTES,
            },
            NoteKind::Endnote => LinkedPart {
                path: self.part(),
                rel_type: rel_types::ENDNOTES,
                content_type: ct::ENDNOTES,
            },
        }
    }

    /// Element name without prefix: `footnote` or `endnote`.
    fn name(self) -> &'static str {
        match self {
            NoteKind::Footnote => "footnote",
            NoteKind::Endnote => "endnote",
        }
    }

    /// Style name stem: `Footnote` or `Endnote`.
    fn style(self) -> &'static str {
        match self {
            NoteKind::Footnote => "Footnote",
            NoteKind::Endnote => "Endnote",
        }
    }

    fn id_namespace(self) -> IdNamespace {
        match self {
            NoteKind::Footnote => IdNamespace::Footnote,
            NoteKind::Endnote => IdNamespace::Endnote,
        }
    }

    fn root(self) -> String {
        format!("w:{}s", self.name())
    }

    /// A notes part holding only the separator (-1) and continuation
    /// separator (0) notes Word expects.
    fn empty_part(self) -> Vec<u8> {
        let name = self.name();
        let spacing = r#"<w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr>"#;
        format!(
            concat!(
                r#"{decl}<w:{name}s xmlns:w="{w}" xmlns:r="{r}">"#,
                r#"<w:{name} w:type="separator" w:id="-1"><w:p>{spacing}<w:r><w:separator/></w:r></w:p></w:{name}>"#,
                r#"<w:{name} w:type="continuationSeparator" w:id="0"><w:p>{spacing}<w:r><w:continuationSeparator/></w:r></w:p></w:{name}>"#,
                "</w:{name}s>"
            ),
            decl = XML_DECLARATION,
            name = name,
            w = WORDML,
            r = OFFICE_RELATIONSHIPS,
            spacing = spacing,
        )
        .into_bytes()
    }

    fn note_xml(self, id: u32, text: &str) -> String {
        format!(
            concat!(
                r#"<w:{name} w:id="{id}"><w:p><w:pPr><w:pStyle w:val="{style}Text"/></w:pPr>"#,
                r#"<w:r><w:rPr><w:rStyle w:val="{style}Reference"/></w:rPr><w:{name}Ref/></w:r>"#,
                r#"<w:r><w:t xml:space="preserve"> {text}</w:t></w:r></w:p></w:{name}>"#
            ),
            name = self.name(),
            style = self.style(),
            id = id,
            text = escape(text),
        )
    }

    fn reference_run(self, id: u32) -> String {
        format!(
            r#"<w:r><w:rPr><w:rStyle w:val="{style}Reference"/></w:rPr><w:{name}Reference w:id="{id}"/></w:r>"#,
            style = self.style(),
            name = self.name(),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteOptions {
    pub text: String,
    /// Text of the paragraph that receives the reference mark.
    pub anchor: String,
}

impl NoteOptions {
    pub fn new(text: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchor: anchor.into(),
        }
    }
}

impl DocxEditor {
    pub fn insert_footnote(&mut self, options: NoteOptions) -> Result<u32> {
        self.insert_note(NoteKind::Footnote, options)
    }

    pub fn insert_endnote(&mut self, options: NoteOptions) -> Result<u32> {
        self.insert_note(NoteKind::Endnote, options)
    }

    /// Add a note and put its reference mark at the end of the anchor
    /// paragraph. Ids come from the notes part alone.
    #[instrument(level = "debug", skip(self, options), fields(anchor = %options.anchor))]
    pub fn insert_note(&mut self, kind: NoteKind, options: NoteOptions) -> Result<u32> {
        require_text("note text", &options.text)?;
        require_text("anchor", &options.anchor)?;
        let part = kind.part();

        let id = self.edit(|tx| {
            let doc = document(tx)?;
            let found = find_paragraph_range(&doc, &options.anchor).in_part(DOCUMENT_PART)?;

            ensure_linked_part(tx, kind.linked(), || kind.empty_part())?;
            let mut notes = tx.require(part)?.to_vec();
            let id = next_id(&notes, kind.id_namespace()).in_part(part)?;
            insert_before_close(&mut notes, &kind.root(), kind.note_xml(id, &options.text).as_bytes()).in_part(part)?;
            tx.put(part, notes);

            let paragraph = found.paragraph.slice(&doc);
            let end = paragraph_content_end(paragraph).in_part(DOCUMENT_PART)?;
            let at = found.paragraph.start + end;
            let updated =
                docx_splice_core::insert_at(&doc, at, kind.reference_run(id).as_bytes()).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(id)
        })?;
        info!("Added {} {} on {:?}", kind.name(), id, options.anchor);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::paragraphs::ParagraphOptions;
    use docx_splice_core::markup::contains;
    use pretty_assertions::assert_eq;

    fn editor() -> DocxEditor {
        let mut editor = DocxEditor::new_blank().unwrap();
        editor.insert_paragraph(ParagraphOptions::new("Claim one")).unwrap();
        editor.insert_paragraph(ParagraphOptions::new("Claim two")).unwrap();
        editor
    }

    #[test]
    fn first_note_follows_the_separators() {
        let mut editor = editor();
        let id = editor.insert_footnote(NoteOptions::new("See appendix", "Claim one")).unwrap();
        assert_eq!(id, 1);
        let id = editor.insert_footnote(NoteOptions::new("Ibid.", "Claim two")).unwrap();
        assert_eq!(id, 2);

        let notes = editor.parts().part("word/footnotes.xml").unwrap();
        assert!(contains(notes, br#"<w:footnote w:id="2">"#));
        let doc = editor.document().unwrap();
        assert!(contains(doc, br#"<w:footnoteReference w:id="2"/></w:r></w:p>"#));
    }

    #[test]
    fn endnotes_have_their_own_ids_and_part() {
        let mut editor = editor();
        editor.insert_footnote(NoteOptions::new("a", "Claim one")).unwrap();
        let id = editor.insert_endnote(NoteOptions::new("b", "Claim one")).unwrap();
        assert_eq!(id, 1);
        let types = editor.parts().part("[Content_Types].xml").unwrap();
        assert!(contains(types, b"/word/endnotes.xml"));
        assert!(contains(types, b"/word/footnotes.xml"));
    }

    #[test]
    fn generated_notes_part_is_well_formed() {
        let part = NoteKind::Endnote.empty_part();
        let text = std::str::from_utf8(&part).unwrap();
        let doc = roxmltree::Document::parse(text).unwrap();
        let ids: Vec<&str> = doc
            .descendants()
            .filter(|n| n.has_tag_name((WORDML, "endnote")))
            .filter_map(|n| n.attribute((WORDML, "id")))
            .collect();
        assert_eq!(ids, ["-1", "0"]);
        assert_eq!(next_id(&part, IdNamespace::Endnote).unwrap(), 1);
    }
}
