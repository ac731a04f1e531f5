//! Feature operations on [`crate::DocxEditor`].
//!
//! Each module adds one `impl DocxEditor` block. Operations generate an XML
//! fragment and hand it to the engine; anything that introduces a new part
//! goes through [`ensure_linked_part`] so the relationship and the
//! content-type override are registered in the same transaction.

pub mod charts;
pub mod comments;
pub mod media;
pub mod notes;
pub mod page;
pub mod paragraphs;
pub mod styles;
pub mod tables;
pub mod toc;
pub mod tracked;
pub mod watermark;
mod workbook;

use docx_splice_core::content_types::{ensure_default, ensure_override, CONTENT_TYPES_PART};
use docx_splice_core::locator::first_element;
use docx_splice_core::markup::{close_tag, is_blank, next_start_tag, rfind};
use docx_splice_core::namespaces::tags;
use docx_splice_core::relationships::empty_relationships;
use docx_splice_core::{ensure_relationship, rels_path_for, SpliceError, Transaction, DOCUMENT_PART};
use tracing::debug;

use crate::error::{PartContext, Result};

/// A part referenced from the main document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinkedPart<'a> {
    pub path: &'a str,
    pub rel_type: &'a str,
    pub content_type: &'a str,
}

pub(crate) fn document(tx: &Transaction<'_>) -> Result<Vec<u8>> {
    Ok(tx.require(DOCUMENT_PART)?.to_vec())
}

/// Relationship target for `part` as seen from `word/document.xml`.
pub(crate) fn document_relative(part: &str) -> &str {
    part.strip_prefix("word/").unwrap_or(part)
}

/// Register a relationship from `source` to `target` and stage the `.rels`
/// part when it changed. Returns the relationship id.
pub(crate) fn link(tx: &mut Transaction<'_>, source: &str, target: &str, rel_type: &str) -> Result<String> {
    let rels_path = rels_path_for(source);
    let mut rels = tx
        .part(&rels_path)
        .map(<[u8]>::to_vec)
        .unwrap_or_else(empty_relationships);
    let ensured = ensure_relationship(&mut rels, target, rel_type).in_part(&rels_path)?;
    if ensured.added {
        debug!("Added relationship {} -> {} in {}", ensured.id, target, rels_path);
        tx.put(rels_path, rels);
    }
    Ok(ensured.id)
}

pub(crate) fn register_override(tx: &mut Transaction<'_>, part: &str, content_type: &str) -> Result<()> {
    let mut types = tx.require(CONTENT_TYPES_PART)?.to_vec();
    if ensure_override(&mut types, part, content_type).in_part(CONTENT_TYPES_PART)? {
        debug!("Registered content type override for {}", part);
        tx.put(CONTENT_TYPES_PART, types);
    }
    Ok(())
}

pub(crate) fn register_default(tx: &mut Transaction<'_>, extension: &str, content_type: &str) -> Result<()> {
    let mut types = tx.require(CONTENT_TYPES_PART)?.to_vec();
    if ensure_default(&mut types, extension, content_type).in_part(CONTENT_TYPES_PART)? {
        debug!("Registered content type default for .{}", extension);
        tx.put(CONTENT_TYPES_PART, types);
    }
    Ok(())
}

/// Create `part` from `initial` when it is missing, then make sure the main
/// document links to it and the manifest covers it. Both are checked even
/// when the part already existed. Returns the relationship id.
pub(crate) fn ensure_linked_part(
    tx: &mut Transaction<'_>,
    part: LinkedPart<'_>,
    initial: impl FnOnce() -> Vec<u8>,
) -> Result<String> {
    if !tx.contains(part.path) {
        debug!("Creating {}", part.path);
        tx.put(part.path, initial());
    }
    let id = link(tx, DOCUMENT_PART, document_relative(part.path), part.rel_type)?;
    register_override(tx, part.path, part.content_type)?;
    Ok(id)
}

/// Standard XML declaration that starts every generated part.
pub(crate) const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

/// Offset inside a paragraph block right after its start tag and `<w:pPr>`,
/// where inline content begins.
pub(crate) fn paragraph_content_start(paragraph: &[u8]) -> docx_splice_core::Result<usize> {
    let open = next_start_tag(paragraph, tags::PARAGRAPH, 0)?
        .ok_or_else(|| SpliceError::invalid("span is not a <w:p> paragraph"))?;
    match first_element(paragraph, tags::PARAGRAPH_PROPS, open.end)? {
        Some(props) if is_blank(&paragraph[open.end..props.start]) => Ok(props.end),
        _ => Ok(open.end),
    }
}

/// Offset of the paragraph's closing `</w:p>`.
pub(crate) fn paragraph_content_end(paragraph: &[u8]) -> docx_splice_core::Result<usize> {
    rfind(paragraph, &close_tag(tags::PARAGRAPH)).ok_or_else(|| SpliceError::malformed("<w:p> is never closed"))
}

/// Require a non-blank string option.
pub(crate) fn require_text<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(crate::DocxError::invalid(format!("{name} cannot be empty")));
    }
    Ok(value)
}
