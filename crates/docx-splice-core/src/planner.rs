use serde::{Deserialize, Serialize};

use crate::anchor::find_paragraph_range;
use crate::error::{Result, SpliceError};
use crate::locator::Span;
use crate::markup::{close_tag, is_blank, next_start_tag, rfind};
use crate::namespaces::tags;

/// Where generated content goes in the document body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "anchor", rename_all = "snake_case")]
pub enum InsertPosition {
    Beginning,
    #[default]
    End,
    AfterText(String),
    BeforeText(String),
}

impl InsertPosition {
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Self::AfterText(anchor) | Self::BeforeText(anchor) => Some(anchor),
            Self::Beginning | Self::End => None,
        }
    }
}

/// Byte offsets of the body's content: just after `<w:body ...>` and just
/// before `</w:body>`.
pub fn body_content(buf: &[u8]) -> Result<Span> {
    let open = next_start_tag(buf, tags::BODY, 0)?
        .ok_or_else(|| SpliceError::malformed("document has no <w:body>"))?;
    if open.self_closing {
        return Ok(Span::new(open.end, open.end));
    }
    let close = rfind(buf, &close_tag(tags::BODY))
        .filter(|&at| at >= open.end)
        .ok_or_else(|| SpliceError::malformed("document has no </w:body>"))?;
    Ok(Span::new(open.end, close))
}

/// Span of the body-level `<w:sectPr>` that ends the body, if any.
///
/// Only a section-properties block followed by nothing but whitespace up to
/// `</w:body>` counts; paragraph-level `sectPr` inside `<w:pPr>` never does.
/// A self-closing `<w:sectPr/>` is returned as the span of its one tag.
pub fn final_section_properties(buf: &[u8]) -> Result<Option<Span>> {
    let body = body_content(buf)?;
    let content = body.slice(buf);

    let mut last = None;
    let mut cursor = 0;
    while let Some(tag) = next_start_tag(content, tags::SECTION_PROPS, cursor)? {
        cursor = tag.end;
        last = Some(tag);
    }
    if let Some(tag) = last.filter(|tag| tag.self_closing && is_blank(&content[tag.end..])) {
        return Ok(Some(Span::new(tag.start, tag.end).offset_by(body.start)));
    }

    let close = close_tag(tags::SECTION_PROPS);
    let Some(close_at) = rfind(content, &close) else {
        return Ok(None);
    };
    let end = close_at + close.len();
    if !is_blank(&content[end..]) {
        return Ok(None);
    }
    let mut open = None;
    let mut cursor = 0;
    while let Some(tag) = next_start_tag(content, tags::SECTION_PROPS, cursor)? {
        if tag.start >= close_at {
            break;
        }
        if !tag.self_closing {
            open = Some(tag.start);
        }
        cursor = tag.end;
    }
    let start = open.ok_or_else(|| SpliceError::malformed("</w:sectPr> without a start tag"))?;
    Ok(Some(Span::new(start, end).offset_by(body.start)))
}

/// Resolve `position` to a byte offset in `buf` where a fragment can be
/// inserted without breaking well-formedness.
pub fn plan_insertion(buf: &[u8], position: &InsertPosition) -> Result<usize> {
    if let Some(anchor) = position.anchor() {
        if anchor.is_empty() {
            return Err(SpliceError::invalid("anchor text must not be empty"));
        }
    }
    match position {
        InsertPosition::Beginning => Ok(body_content(buf)?.start),
        InsertPosition::End => match final_section_properties(buf)? {
            Some(sect) => Ok(sect.start),
            None => Ok(body_content(buf)?.end),
        },
        InsertPosition::AfterText(anchor) => {
            body_content(buf)?;
            Ok(find_paragraph_range(buf, anchor)?.paragraph.end)
        }
        InsertPosition::BeforeText(anchor) => {
            body_content(buf)?;
            Ok(find_paragraph_range(buf, anchor)?.paragraph.start)
        }
    }
}

/// New buffer with `fragment` inserted at `offset`.
pub fn insert_at(buf: &[u8], offset: usize, fragment: &[u8]) -> Result<Vec<u8>> {
    if offset > buf.len() {
        return Err(SpliceError::invalid(format!(
            "offset {offset} is past the end of a {}-byte buffer",
            buf.len()
        )));
    }
    Ok(crate::markup::splice(buf, offset, offset, fragment))
}

/// New buffer with `span` replaced by `replacement`.
pub fn replace_span(buf: &[u8], span: Span, replacement: &[u8]) -> Result<Vec<u8>> {
    if span.start > span.end || span.end > buf.len() {
        return Err(SpliceError::invalid(format!(
            "span {}..{} is outside a {}-byte buffer",
            span.start,
            span.end,
            buf.len()
        )));
    }
    Ok(crate::markup::splice(buf, span.start, span.end, replacement))
}

/// Insert `fragment` at the planned offset for `position`.
pub fn insert_fragment(buf: &[u8], position: &InsertPosition, fragment: &[u8]) -> Result<Vec<u8>> {
    let offset = plan_insertion(buf, position)?;
    insert_at(buf, offset, fragment)
}
