//! Inline pictures, plus the paragraph lookups shared with charts.

use docx_splice_core::markup::{contains, find, find_from};
use docx_splice_core::namespaces::tags;
use docx_splice_core::{blocks, SpliceError, Span, DOCUMENT_PART};
use tracing::{info, instrument};

use crate::editor::DocxEditor;
use crate::error::{PartContext, Result};
use crate::features::document;

const BLIP: &[u8] = b"<a:blip ";

/// Body paragraphs whose bytes satisfy `holds`, in document order.
fn paragraphs_where(doc: &[u8], holds: impl Fn(&[u8]) -> bool) -> docx_splice_core::Result<Vec<Span>> {
    let mut found = Vec::new();
    for block in blocks(doc, tags::PARAGRAPH) {
        let span = block?;
        if holds(span.slice(doc)) {
            found.push(span);
        }
    }
    Ok(found)
}

fn remove_nth(doc: &[u8], spans: &[Span], what: &str, n: usize) -> docx_splice_core::Result<Vec<u8>> {
    if n == 0 {
        return Err(SpliceError::invalid(format!("{what} index is 1-based")));
    }
    let span = spans
        .get(n - 1)
        .ok_or_else(|| SpliceError::not_found(what, n, spans.len()))?;
    let mut updated = doc.to_vec();
    updated.drain(span.range());
    Ok(updated)
}

pub(crate) fn count_paragraphs_with(doc: &[u8], marker: &[u8]) -> docx_splice_core::Result<usize> {
    Ok(paragraphs_where(doc, |p| contains(p, marker))?.len())
}

/// Drop the `n`-th (1-based) paragraph containing `marker`.
pub(crate) fn remove_nth_paragraph_with(
    doc: &[u8],
    marker: &[u8],
    what: &str,
    n: usize,
) -> docx_splice_core::Result<Vec<u8>> {
    let spans = paragraphs_where(doc, |p| contains(p, marker))?;
    remove_nth(doc, &spans, what, n)
}

/// A picture is a blip that embeds a package image by relationship id.
fn holds_picture(paragraph: &[u8]) -> bool {
    let mut cursor = 0;
    while let Some(at) = find_from(paragraph, BLIP, cursor) {
        let tag_end = find_from(paragraph, b">", at).unwrap_or(paragraph.len());
        if find(&paragraph[at..tag_end], b"r:embed=").is_some() {
            return true;
        }
        cursor = at + BLIP.len();
    }
    false
}

impl DocxEditor {
    /// Remove the paragraph holding the `n`-th (1-based) picture. The media
    /// part and its relationship are left in place.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_image(&mut self, n: usize) -> Result<()> {
        self.edit(|tx| {
            let doc = document(tx)?;
            let spans = paragraphs_where(&doc, holds_picture).in_part(DOCUMENT_PART)?;
            let updated = remove_nth(&doc, &spans, "image", n).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Deleted image {}", n);
        Ok(())
    }

    pub fn image_count(&self) -> Result<usize> {
        let spans = paragraphs_where(self.document()?, holds_picture).in_part(DOCUMENT_PART)?;
        Ok(spans.len())
    }
}
