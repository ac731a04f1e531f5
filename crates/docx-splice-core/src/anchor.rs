//! Paragraph lookup by rendered text.
//!
//! Word splits visible text across runs at arbitrary points (spell-check
//! marks, formatting changes, revision ids), so anchors are matched against
//! the concatenation of every `<w:t>` in a paragraph rather than raw XML.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpliceError};
use crate::locator::{blocks, Span};
use crate::markup::{find_from, next_start_tag, unescape};
use crate::namespaces::tags;

/// A paragraph whose rendered text contains an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorMatch {
    pub paragraph: Span,
    /// Byte offset of the match inside the paragraph's rendered text.
    pub text_offset: usize,
}

/// Rendered text of one paragraph block: the unescaped contents of its
/// `<w:t>` elements, in order. `<w:delText>` and field instructions are not
/// part of the rendered text.
pub fn paragraph_text(paragraph: &[u8]) -> Result<String> {
    let mut text = String::new();
    let close = b"</w:t>";
    let mut cursor = 0;
    while let Some(open) = next_start_tag(paragraph, tags::TEXT, cursor)? {
        if open.self_closing {
            cursor = open.end;
            continue;
        }
        let end = find_from(paragraph, close, open.end)
            .ok_or_else(|| SpliceError::malformed("<w:t> is never closed"))?;
        let raw = std::str::from_utf8(&paragraph[open.end..end])
            .map_err(|e| SpliceError::malformed(format!("text run is not UTF-8: {e}")))?;
        text.push_str(&unescape(raw));
        cursor = end + close.len();
    }
    Ok(text)
}

/// First paragraph of `buf` whose rendered text contains `anchor`.
pub fn find_paragraph_range(buf: &[u8], anchor: &str) -> Result<AnchorMatch> {
    if anchor.is_empty() {
        return Err(SpliceError::invalid("anchor text must not be empty"));
    }
    for block in blocks(buf, tags::PARAGRAPH) {
        let paragraph = block?;
        let text = paragraph_text(paragraph.slice(buf))?;
        if let Some(text_offset) = text.find(anchor) {
            return Ok(AnchorMatch {
                paragraph,
                text_offset,
            });
        }
    }
    Err(SpliceError::AnchorNotFound {
        anchor: anchor.to_string(),
    })
}

/// Every paragraph span of `buf` paired with its rendered text.
pub fn paragraphs_with_text(buf: &[u8]) -> Result<Vec<(Span, String)>> {
    blocks(buf, tags::PARAGRAPH)
        .map(|block| {
            let span = block?;
            Ok((span, paragraph_text(span.slice(buf))?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BODY: &str = concat!(
        "<w:body>",
        "<w:p><w:r><w:t>First</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>Hel</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">lo Wor</w:t></w:r>",
        "<w:r><w:t>ld</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>R&amp;D budget</w:t></w:r></w:p>",
        "</w:body>"
    );

    #[test]
    fn anchor_split_across_runs_is_found() {
        let buf = BODY.as_bytes();
        let found = find_paragraph_range(buf, "lo Wor").unwrap();
        assert_eq!(found.text_offset, 3);
        let text = paragraph_text(found.paragraph.slice(buf)).unwrap();
        assert_eq!(text, "Hello World");
    }

    #[test]
    fn entities_are_resolved_before_matching() {
        let buf = BODY.as_bytes();
        let found = find_paragraph_range(buf, "R&D").unwrap();
        assert!(found.paragraph.slice(buf).ends_with(b"budget</w:t></w:r></w:p>"));
    }

    #[test]
    fn first_match_wins() {
        let buf = b"<w:p><w:r><w:t>dup</w:t></w:r></w:p><w:p><w:r><w:t>dup</w:t></w:r></w:p>";
        let found = find_paragraph_range(buf, "dup").unwrap();
        assert_eq!(found.paragraph.start, 0);
    }

    #[test]
    fn missing_and_empty_anchors() {
        let buf = BODY.as_bytes();
        assert_eq!(
            find_paragraph_range(buf, "absent").unwrap_err(),
            SpliceError::AnchorNotFound {
                anchor: "absent".into()
            }
        );
        assert!(matches!(
            find_paragraph_range(buf, "").unwrap_err(),
            SpliceError::InvalidArgument(_)
        ));
    }

    #[test]
    fn tabs_and_deleted_text_are_not_rendered() {
        let p = b"<w:p><w:r><w:tab/><w:t>kept</w:t></w:r><w:del><w:r><w:delText>gone</w:delText></w:r></w:del></w:p>";
        assert_eq!(paragraph_text(p).unwrap(), "kept");
    }

    #[test]
    fn paragraphs_are_listed_in_order() {
        let listed = paragraphs_with_text(BODY.as_bytes()).unwrap();
        let texts: Vec<&str> = listed.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["First", "Hello World", "R&D budget"]);
    }
}
