//! Table, row and cell edits addressed by 1-based ordinals.
//!
//! Columns are counted in `<w:tc>` elements, not grid columns: after a
//! horizontal merge the merged cell is one column. Tables nested inside a
//! cell cannot be addressed.
//!
//! Every function takes the document bytes by reference and returns a new
//! buffer; the input is never modified, so a failed edit leaves nothing
//! half-applied.

use crate::anchor::paragraph_text;
use crate::error::{require_ordinal, Result, SpliceError};
use crate::locator::{count_blocks, find_nth_block, find_nth_block_within, first_element, Span};
use crate::markup::{escape, is_blank, next_start_tag};
use crate::namespaces::tags;
use crate::planner::replace_span;

/// Spans of a table, one of its rows and one cell of that row, all in
/// document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellLocation {
    pub table: Span,
    pub row: Span,
    pub cell: Span,
}

pub fn count_tables(document: &[u8]) -> Result<usize> {
    count_blocks(document, tags::TABLE)
}

pub fn count_cells(document: &[u8], table: usize, row: usize) -> Result<usize> {
    let table = find_nth_block(document, tags::TABLE, table)?;
    let row = find_nth_block_within(document, table, tags::ROW, row)?;
    count_blocks(row.slice(document), tags::CELL)
}

pub fn locate_cell(document: &[u8], table: usize, row: usize, col: usize) -> Result<CellLocation> {
    require_ordinal("table", table)?;
    require_ordinal("row", row)?;
    require_ordinal("column", col)?;
    let table = find_nth_block(document, tags::TABLE, table)?;
    let row = find_nth_block_within(document, table, tags::ROW, row)?;
    let cell = find_nth_block_within(document, row, tags::CELL, col)?;
    Ok(CellLocation { table, row, cell })
}

/// Rendered text of a cell, one line per paragraph.
pub fn cell_text(document: &[u8], table: usize, row: usize, col: usize) -> Result<String> {
    let cell = locate_cell(document, table, row, col)?.cell;
    let cell = cell.slice(document);
    let mut lines = Vec::new();
    for paragraph in crate::locator::blocks(cell, tags::PARAGRAPH) {
        lines.push(paragraph_text(paragraph?.slice(cell))?);
    }
    Ok(lines.join("\n"))
}

/// Merge cells `start_col..=end_col` of one row into the first of them.
///
/// The first cell keeps its content and receives a `gridSpan`; the other
/// cells are removed together with their content.
pub fn merge_horizontal(
    document: &[u8],
    table: usize,
    row: usize,
    start_col: usize,
    end_col: usize,
) -> Result<Vec<u8>> {
    require_ordinal("table", table)?;
    require_ordinal("row", row)?;
    require_ordinal("start column", start_col)?;
    if end_col <= start_col {
        return Err(SpliceError::invalid(format!(
            "end column ({end_col}) must be greater than start column ({start_col})"
        )));
    }

    let first = locate_cell(document, table, row, start_col)?;
    let last = find_nth_block_within(document, first.row, tags::CELL, end_col)?;

    let span = end_col - start_col + 1;
    let merged = set_cell_property(
        first.cell.slice(document),
        tags::GRID_SPAN,
        &format!("<w:gridSpan w:val=\"{span}\"/>"),
    )?;
    replace_span(document, Span::new(first.cell.start, last.end), &merged)
}

/// Merge column `col` of rows `start_row..=end_row`.
///
/// The first cell gets `vMerge="restart"` and the following ones a bare
/// `vMerge`; their content stays in place even though Word only renders the
/// first cell.
pub fn merge_vertical(
    document: &[u8],
    table: usize,
    start_row: usize,
    end_row: usize,
    col: usize,
) -> Result<Vec<u8>> {
    require_ordinal("table", table)?;
    require_ordinal("column", col)?;
    require_ordinal("start row", start_row)?;
    if end_row <= start_row {
        return Err(SpliceError::invalid(format!(
            "end row ({end_row}) must be greater than start row ({start_row})"
        )));
    }

    let mut out = document.to_vec();
    for row in start_row..=end_row {
        // Re-locate on every pass: the previous edit shifted the offsets.
        let location = locate_cell(&out, table, row, col)?;
        let marker = if row == start_row {
            "<w:vMerge w:val=\"restart\"/>"
        } else {
            "<w:vMerge/>"
        };
        let cell = set_cell_property(location.cell.slice(&out), tags::VMERGE, marker)?;
        out = replace_span(&out, location.cell, &cell)?;
    }
    Ok(out)
}

/// Replace the text of one cell with a single run.
///
/// `<w:tcPr>` and the first paragraph's `<w:pPr>` are kept; every other
/// paragraph of the cell is dropped. An empty `text` leaves an empty
/// paragraph, which the schema requires in every cell.
pub fn set_cell_text(document: &[u8], table: usize, row: usize, col: usize, text: &str) -> Result<Vec<u8>> {
    let location = locate_cell(document, table, row, col)?;
    let cell = location.cell.slice(document);

    let open = next_start_tag(cell, tags::CELL, 0)?
        .ok_or_else(|| SpliceError::malformed("cell without a <w:tc> start tag"))?;
    let mut rebuilt = cell[..open.end].to_vec();

    if let Some(props) = first_element(cell, tags::CELL_PROPS, open.end)? {
        if is_blank(&cell[open.end..props.start]) {
            rebuilt.extend_from_slice(props.slice(cell));
        }
    }

    let paragraph = first_element(cell, tags::PARAGRAPH, open.end)?;
    match paragraph {
        Some(p) => {
            let p_bytes = p.slice(cell);
            let p_open = next_start_tag(p_bytes, tags::PARAGRAPH, 0)?
                .ok_or_else(|| SpliceError::malformed("paragraph without a start tag"))?;
            if p_open.self_closing {
                rebuilt.extend_from_slice(&p_bytes[..p_open.end - 2]);
                rebuilt.push(b'>');
            } else {
                rebuilt.extend_from_slice(&p_bytes[..p_open.end]);
                if let Some(props) = first_element(p_bytes, tags::PARAGRAPH_PROPS, p_open.end)? {
                    if is_blank(&p_bytes[p_open.end..props.start]) {
                        rebuilt.extend_from_slice(props.slice(p_bytes));
                    }
                }
            }
        }
        None => rebuilt.extend_from_slice(b"<w:p>"),
    }
    if !text.is_empty() {
        rebuilt.extend_from_slice(b"<w:r><w:t xml:space=\"preserve\">");
        rebuilt.extend_from_slice(escape(text).as_bytes());
        rebuilt.extend_from_slice(b"</w:t></w:r>");
    }
    rebuilt.extend_from_slice(b"</w:p></w:tc>");

    replace_span(document, location.cell, &rebuilt)
}

/// Remove the `n`-th table. Everything around it is kept byte-for-byte.
pub fn delete_table(document: &[u8], table: usize) -> Result<Vec<u8>> {
    let span = find_nth_block(document, tags::TABLE, table)?;
    replace_span(document, span, b"")
}

/// Elements that must precede `tag` inside `<w:tcPr>`.
fn preceding_cell_properties(tag: &str) -> &'static [&'static str] {
    match tag {
        tags::GRID_SPAN => &["w:cnfStyle", "w:tcW"],
        tags::VMERGE => &["w:cnfStyle", "w:tcW", "w:gridSpan", "w:hMerge"],
        _ => &["w:cnfStyle"],
    }
}

/// Put `element` (a complete `tag` element) into the cell's `<w:tcPr>`,
/// replacing an existing `tag` element and creating `<w:tcPr>` if needed.
pub fn set_cell_property(cell: &[u8], tag: &str, element: &str) -> Result<Vec<u8>> {
    let open = next_start_tag(cell, tags::CELL, 0)?
        .ok_or_else(|| SpliceError::malformed("cell without a <w:tc> start tag"))?;
    let props = first_element(cell, tags::CELL_PROPS, open.end)?
        .filter(|props| is_blank(&cell[open.end..props.start]));

    let Some(props) = props else {
        let fragment = format!("<w:tcPr>{element}</w:tcPr>");
        return replace_span(cell, Span::new(open.end, open.end), fragment.as_bytes());
    };

    let props_bytes = props.slice(cell);
    let props_open = next_start_tag(props_bytes, tags::CELL_PROPS, 0)?
        .ok_or_else(|| SpliceError::malformed("<w:tcPr> without a start tag"))?;
    if props_open.self_closing {
        let head = &props_bytes[..props_open.end - 2];
        let mut expanded = head.trim_ascii_end().to_vec();
        expanded.push(b'>');
        expanded.extend_from_slice(element.as_bytes());
        expanded.extend_from_slice(b"</w:tcPr>");
        return replace_span(cell, props, &expanded);
    }

    let inner = Span::new(props_open.end, props_bytes.len() - b"</w:tcPr>".len());
    let inner_bytes = inner.slice(props_bytes);
    let replaced = match first_element(inner_bytes, tag, 0)? {
        Some(existing) => replace_span(inner_bytes, existing, element.as_bytes())?,
        None => {
            let mut at = 0;
            for before in preceding_cell_properties(tag) {
                if let Some(found) = first_element(inner_bytes, before, 0)? {
                    at = at.max(found.end);
                }
            }
            replace_span(inner_bytes, Span::new(at, at), element.as_bytes())?
        }
    };
    replace_span(cell, inner.offset_by(props.start), &replaced)
}
