//! Positional element lookup without a tree parser.
//!
//! A block is an element from its start tag to the *first* following closing
//! tag with the same name. Elements with the same name must not nest: a table
//! inside a table cell cannot be addressed by ordinal, and its closing tag
//! would end the outer block early.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{require_ordinal, Result, SpliceError};
use crate::markup::{close_tag, find_from, next_start_tag};

/// Half-open byte range into one specific buffer.
///
/// Spans are invalidated by any mutation of the buffer they were computed
/// against and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.range()]
    }

    /// Translate a span computed inside `self`'s bytes to the outer buffer.
    pub fn offset_by(&self, base: usize) -> Span {
        Span::new(self.start + base, self.end + base)
    }
}

/// Iterator over the blocks of one element name, in document order.
#[derive(Debug)]
pub struct Blocks<'a> {
    buf: &'a [u8],
    tag: &'a str,
    close: Vec<u8>,
    cursor: usize,
    failed: bool,
}

impl Iterator for Blocks<'_> {
    type Item = Result<Span>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let open = match next_start_tag(self.buf, self.tag, self.cursor) {
                Ok(Some(open)) => open,
                Ok(None) => return None,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            };
            if open.self_closing {
                self.cursor = open.end;
                continue;
            }
            return match find_from(self.buf, &self.close, open.end) {
                Some(close_at) => {
                    let end = close_at + self.close.len();
                    self.cursor = end;
                    Some(Ok(Span::new(open.start, end)))
                }
                None => {
                    self.failed = true;
                    Some(Err(SpliceError::malformed(format!(
                        "<{}> at byte {} is never closed",
                        self.tag, open.start
                    ))))
                }
            };
        }
    }
}

/// All blocks named `tag` in `buf`.
pub fn blocks<'a>(buf: &'a [u8], tag: &'a str) -> Blocks<'a> {
    Blocks {
        buf,
        tag,
        close: close_tag(tag),
        cursor: 0,
        failed: false,
    }
}

/// Span of the `n`-th (1-based) `tag` block in `buf`.
pub fn find_nth_block(buf: &[u8], tag: &str, n: usize) -> Result<Span> {
    require_ordinal(tag, n)?;
    let mut found = 0;
    for block in blocks(buf, tag) {
        let span = block?;
        found += 1;
        if found == n {
            return Ok(span);
        }
    }
    Err(SpliceError::not_found(tag, n, found))
}

/// Number of `tag` blocks in `buf`.
pub fn count_blocks(buf: &[u8], tag: &str) -> Result<usize> {
    blocks(buf, tag).try_fold(0, |count, block| block.map(|_| count + 1))
}

/// First `tag` element at or after `from`, self-closing or not.
///
/// Unlike [`blocks`], an empty element such as `<w:tcPr/>` is returned too.
pub fn first_element(buf: &[u8], tag: &str, from: usize) -> Result<Option<Span>> {
    let Some(open) = next_start_tag(buf, tag, from)? else {
        return Ok(None);
    };
    if open.self_closing {
        return Ok(Some(Span::new(open.start, open.end)));
    }
    let close = close_tag(tag);
    let close_at = find_from(buf, &close, open.end)
        .ok_or_else(|| SpliceError::malformed(format!("<{tag}> at byte {} is never closed", open.start)))?;
    Ok(Some(Span::new(open.start, close_at + close.len())))
}

/// Locate the `n`-th `tag` block nested inside `outer` and return its span in
/// the coordinates of the whole buffer.
pub fn find_nth_block_within(buf: &[u8], outer: Span, tag: &str, n: usize) -> Result<Span> {
    find_nth_block(outer.slice(buf), tag, n).map(|inner| inner.offset_by(outer.start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLES: &str = concat!(
        "<w:body>",
        "<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>",
        "<w:p><w:r><w:t>between</w:t></w:r></w:p>",
        "<w:tbl w:rsid=\"00AB\"><w:tblPr/><w:tr><w:tc/></w:tr></w:tbl>",
        "</w:body>"
    );

    #[test]
    fn every_ordinal_up_to_count_is_a_complete_block() {
        let buf = TABLES.as_bytes();
        let count = count_blocks(buf, "w:tbl").unwrap();
        assert_eq!(count, 2);
        for n in 1..=count {
            let span = find_nth_block(buf, "w:tbl", n).unwrap();
            let text = std::str::from_utf8(span.slice(buf)).unwrap();
            assert!(text.starts_with("<w:tbl"), "{text}");
            assert!(text.ends_with("</w:tbl>"), "{text}");
        }
        assert_eq!(
            find_nth_block(buf, "w:tbl", 3).unwrap_err(),
            SpliceError::not_found("w:tbl", 3, 2)
        );
    }

    #[test]
    fn attribute_form_and_exact_form_both_match() {
        let buf = TABLES.as_bytes();
        let second = find_nth_block(buf, "w:tbl", 2).unwrap();
        assert!(second.slice(buf).starts_with(b"<w:tbl w:rsid=\"00AB\">"));
    }

    #[test]
    fn self_closing_elements_are_not_blocks() {
        let buf = b"<w:p/><w:p w:rsidR=\"1\"/><w:p><w:r/></w:p>";
        assert_eq!(count_blocks(buf, "w:p").unwrap(), 1);
        let span = find_nth_block(buf, "w:p", 1).unwrap();
        assert_eq!(span.slice(buf), b"<w:p><w:r/></w:p>");
    }

    #[test]
    fn similar_names_are_not_confused() {
        let buf = b"<w:pPr><w:pStyle w:val=\"x\"/></w:pPr><w:p><w:pPr/></w:p>";
        let span = find_nth_block(buf, "w:p", 1).unwrap();
        assert_eq!(span.slice(buf), b"<w:p><w:pPr/></w:p>");
        assert_eq!(count_blocks(buf, "w:pPr").unwrap(), 1);
    }

    #[test]
    fn unclosed_block_is_malformed() {
        let err = find_nth_block(b"<w:tbl><w:tr></w:tr>", "w:tbl", 1).unwrap_err();
        assert!(matches!(err, SpliceError::Malformed(_)));
        assert!(count_blocks(b"<w:tbl>", "w:tbl").is_err());
    }

    #[test]
    fn zero_ordinal_is_rejected() {
        let err = find_nth_block(TABLES.as_bytes(), "w:tbl", 0).unwrap_err();
        assert!(matches!(err, SpliceError::InvalidArgument(_)));
    }

    #[test]
    fn replacing_a_block_with_itself_is_byte_identical() {
        let buf = TABLES.as_bytes();
        let span = find_nth_block(buf, "w:p", 1).unwrap();
        let copy = span.slice(buf).to_vec();
        let rebuilt = crate::markup::splice(buf, span.start, span.end, &copy);
        assert_eq!(rebuilt, buf);
    }

    #[test]
    fn nested_lookup_reports_outer_coordinates() {
        let buf = TABLES.as_bytes();
        let table = find_nth_block(buf, "w:tbl", 1).unwrap();
        let row = find_nth_block_within(buf, table, "w:tr", 1).unwrap();
        assert_eq!(row.slice(buf), b"<w:tr><w:tc><w:p/></w:tc></w:tr>");
    }

    #[test]
    fn nested_same_name_tables_end_at_first_close() {
        // Documented limitation: the outer block ends at the inner table's close tag.
        let buf = b"<w:tbl><w:tc><w:tbl><w:tr/></w:tbl></w:tc></w:tbl>";
        let span = find_nth_block(buf, "w:tbl", 1).unwrap();
        assert_eq!(span.slice(buf), b"<w:tbl><w:tc><w:tbl><w:tr/></w:tbl>");
    }
}
