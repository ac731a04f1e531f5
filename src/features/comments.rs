//! Comments anchored to a paragraph.

use chrono::{DateTime, SecondsFormat, Utc};
use docx_splice_core::markup::{escape, insert_before_close};
use docx_splice_core::namespaces::{content_types as ct, rel_types, OFFICE_RELATIONSHIPS, WORDML};
use docx_splice_core::{find_paragraph_range, next_id, IdNamespace, DOCUMENT_PART};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::{
    document, ensure_linked_part, paragraph_content_end, paragraph_content_start, require_text, LinkedPart,
    XML_DECLARATION,
};

pub const COMMENTS_PART: &str = "word/comments.xml";

const COMMENTS: LinkedPart<'static> = LinkedPart {
    path: COMMENTS_PART,
    rel_type: rel_types::COMMENTS,
    content_type: ct::COMMENTS,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentOptions {
    pub text: String,
    /// Text of the paragraph the comment is attached to.
    pub anchor: String,
    /// Defaults to the editor's author.
    pub author: Option<String>,
    /// Defaults to the first letter of the author.
    pub initials: Option<String>,
}

/// A comment read back from `word/comments.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u32,
    pub author: String,
    pub initials: String,
    pub date: Option<String>,
    pub text: String,
}

fn empty_comments_part() -> Vec<u8> {
    format!(r#"{XML_DECLARATION}<w:comments xmlns:w="{WORDML}" xmlns:r="{OFFICE_RELATIONSHIPS}"></w:comments>"#).into_bytes()
}

fn comment_xml(id: u32, author: &str, initials: &str, date: DateTime<Utc>, text: &str) -> String {
    format!(
        concat!(
            r#"<w:comment w:id="{id}" w:author="{author}" w:date="{date}" w:initials="{initials}">"#,
            r#"<w:p><w:pPr><w:pStyle w:val="CommentText"/></w:pPr>"#,
            r#"<w:r><w:rPr><w:rStyle w:val="CommentReference"/></w:rPr><w:annotationRef/></w:r>"#,
            r#"<w:r><w:t xml:space="preserve"> {text}</w:t></w:r></w:p>"#,
            "</w:comment>"
        ),
        id = id,
        author = escape(author),
        date = date.to_rfc3339_opts(SecondsFormat::Secs, true),
        initials = escape(initials),
        text = escape(text),
    )
}

fn reference_run(id: u32) -> String {
    format!(
        r#"<w:commentRangeEnd w:id="{id}"/><w:r><w:rPr><w:rStyle w:val="CommentReference"/></w:rPr><w:commentReference w:id="{id}"/></w:r>"#
    )
}

impl DocxEditor {
    /// Attach a comment to the first paragraph containing `options.anchor`.
    /// Returns the new comment id.
    #[instrument(level = "debug", skip(self, options), fields(anchor = %options.anchor))]
    pub fn insert_comment(&mut self, options: CommentOptions) -> Result<u32> {
        require_text("comment text", &options.text)?;
        require_text("anchor", &options.anchor)?;
        let author = options
            .author
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| self.author().to_string());
        let initials = options
            .initials
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| author.chars().take(1).collect());
        let date = Self::now();

        let id = self.edit(|tx| {
            let doc = document(tx)?;
            let found = find_paragraph_range(&doc, &options.anchor).in_part(DOCUMENT_PART)?;

            ensure_linked_part(tx, COMMENTS, empty_comments_part)?;
            let mut comments = tx.require(COMMENTS_PART)?.to_vec();
            let id = next_id(&comments, IdNamespace::Comment).in_part(COMMENTS_PART)?;
            let entry = comment_xml(id, &author, &initials, date, &options.text);
            insert_before_close(&mut comments, "w:comments", entry.as_bytes()).in_part(COMMENTS_PART)?;
            tx.put(COMMENTS_PART, comments);

            let paragraph = found.paragraph.slice(&doc);
            let start = paragraph_content_start(paragraph).in_part(DOCUMENT_PART)?;
            let end = paragraph_content_end(paragraph).in_part(DOCUMENT_PART)?;
            let mut rebuilt = Vec::with_capacity(paragraph.len() + 256);
            rebuilt.extend_from_slice(&paragraph[..start]);
            rebuilt.extend_from_slice(format!(r#"<w:commentRangeStart w:id="{id}"/>"#).as_bytes());
            rebuilt.extend_from_slice(&paragraph[start..end]);
            rebuilt.extend_from_slice(reference_run(id).as_bytes());
            rebuilt.extend_from_slice(&paragraph[end..]);

            let updated = docx_splice_core::replace_span(&doc, found.paragraph, &rebuilt).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(id)
        })?;
        info!("Added comment {} by {} on {:?}", id, author, options.anchor);
        Ok(id)
    }

    /// Every comment of the document, in part order. Empty when the
    /// document has no comments part.
    pub fn comments(&self) -> Result<Vec<Comment>> {
        let Some(bytes) = self.parts().part(COMMENTS_PART) else {
            return Ok(Vec::new());
        };
        let text = std::str::from_utf8(bytes).map_err(|_| DocxError::Encoding(COMMENTS_PART.to_string()))?;
        let doc = roxmltree::Document::parse(text).map_err(|source| DocxError::Xml {
            part: COMMENTS_PART.to_string(),
            source,
        })?;

        let attr = |node: &roxmltree::Node<'_, '_>, name: &str| node.attribute((WORDML, name)).map(str::to_string);
        Ok(doc
            .descendants()
            .filter(|n| n.has_tag_name((WORDML, "comment")))
            .filter_map(|node| {
                let id = attr(&node, "id")?.parse().ok()?;
                let body: String = node
                    .descendants()
                    .filter(|n| n.has_tag_name((WORDML, "t")))
                    .filter_map(|t| t.text())
                    .collect();
                Some(Comment {
                    id,
                    author: attr(&node, "author").unwrap_or_default(),
                    initials: attr(&node, "initials").unwrap_or_default(),
                    date: attr(&node, "date"),
                    text: body.trim().to_string(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::paragraphs::ParagraphOptions;
    use docx_splice_core::markup::contains;
    use pretty_assertions::assert_eq;

    fn editor() -> DocxEditor {
        let mut editor = DocxEditor::new_blank().unwrap().with_author("Grace Hopper");
        editor.insert_paragraph(ParagraphOptions::new("Quarterly revenue grew")).unwrap();
        editor
    }

    #[test]
    fn comment_ids_increase_and_round_trip() {
        let mut editor = editor();
        let first = editor
            .insert_comment(CommentOptions {
                text: "Source?".into(),
                anchor: "revenue".into(),
                ..CommentOptions::default()
            })
            .unwrap();
        let second = editor
            .insert_comment(CommentOptions {
                text: "Check Q3 <draft>".into(),
                anchor: "Quarterly".into(),
                author: Some("Ada".into()),
                ..CommentOptions::default()
            })
            .unwrap();
        assert!(second > first);

        let comments = editor.comments().unwrap();
        let last = comments.last().unwrap();
        assert_eq!(last.id, second);
        assert_eq!(last.author, "Ada");
        assert_eq!(last.initials, "A");
        assert_eq!(last.text, "Check Q3 <draft>");
        assert!(comments.iter().any(|c| c.id == first && c.initials == "G"));

        let doc = editor.document().unwrap();
        let marker = format!(r#"<w:commentReference w:id="{second}"/>"#);
        assert!(contains(doc, marker.as_bytes()));
        assert!(contains(editor.parts().part("[Content_Types].xml").unwrap(), b"/word/comments.xml"));
    }

    #[test]
    fn missing_anchor_changes_nothing() {
        let mut editor = editor();
        let snapshot = |e: &DocxEditor| -> Vec<(String, Vec<u8>)> {
            e.parts().parts().map(|(n, b)| (n.to_string(), b.to_vec())).collect()
        };
        let before = snapshot(&editor);
        let err = editor
            .insert_comment(CommentOptions {
                text: "x".into(),
                anchor: "nowhere".into(),
                ..CommentOptions::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), Some(docx_splice_core::ErrorKind::NotFound));
        assert_eq!(snapshot(&editor), before);
    }
}
