//! Table insertion, cell edits, merges, deletion and a read-only summary.

use docx_splice_core::cells;
use docx_splice_core::markup::escape;
use docx_splice_core::namespaces::WORDML;
use docx_splice_core::planner::insert_fragment;
use docx_splice_core::{InsertPosition, DOCUMENT_PART};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::document;
use crate::xml::{self, RunFormat};

/// Usable text width of a Letter page with one-inch margins, in twips.
const DEFAULT_TABLE_WIDTH: u32 = 9360;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub rows: Vec<Vec<String>>,
    /// Render the first row bold and repeat it on every page.
    pub header: bool,
    /// Column widths in twips. Missing widths share the default table width.
    pub column_widths: Option<Vec<u32>>,
    /// Table style id, e.g. `TableGrid`.
    pub style: Option<String>,
    pub position: InsertPosition,
}

impl TableOptions {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn widths(&self, columns: usize) -> Vec<u32> {
        let fallback = DEFAULT_TABLE_WIDTH / columns.max(1) as u32;
        (0..columns)
            .map(|i| {
                self.column_widths
                    .as_ref()
                    .and_then(|w| w.get(i).copied())
                    .unwrap_or(fallback)
            })
            .collect()
    }

    fn to_xml(&self) -> String {
        let columns = self.columns();
        let widths = self.widths(columns);

        let mut out = String::from("<w:tbl><w:tblPr>");
        if let Some(style) = self.style.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!(r#"<w:tblStyle w:val="{}"/>"#, escape(style)));
        }
        out.push_str(r#"<w:tblW w:w="0" w:type="auto"/><w:tblBorders>"#);
        for edge in ["top", "left", "bottom", "right", "insideH", "insideV"] {
            out.push_str(&format!(
                r#"<w:{edge} w:val="single" w:sz="4" w:space="0" w:color="auto"/>"#
            ));
        }
        out.push_str(r#"</w:tblBorders><w:tblLook w:val="04A0"/></w:tblPr>"#);
        out.push_str(&render_grid(&widths));

        for (r, row) in self.rows.iter().enumerate() {
            let is_header = self.header && r == 0;
            out.push_str("<w:tr>");
            if is_header {
                out.push_str("<w:trPr><w:tblHeader/></w:trPr>");
            }
            for (c, width) in widths.iter().enumerate() {
                let text = row.get(c).map(String::as_str).unwrap_or("");
                let format = if is_header { RunFormat::bold() } else { RunFormat::default() };
                out.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/></w:tcPr>{}</w:tc>"#,
                    xml::paragraph(text, None, &format)
                ));
            }
            out.push_str("</w:tr>");
        }
        out.push_str("</w:tbl>");
        out
    }
}

fn render_grid(widths: &[u32]) -> String {
    let mut s = String::from("<w:tblGrid>");
    for w in widths {
        s.push_str(&format!(r#"<w:gridCol w:w="{w}"/>"#));
    }
    s.push_str("</w:tblGrid>");
    s
}

/// A merged region, 0-based in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMerge {
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

/// Read-only view of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    /// 1-based, as accepted by the table operations.
    pub index: usize,
    pub rows: usize,
    pub cols: usize,
    /// Grid column widths in twips.
    pub column_widths: Vec<u32>,
    pub merges: Vec<CellMerge>,
    pub cells: Vec<Vec<String>>,
}

fn is_w(node: &roxmltree::Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(WORDML)
}

fn w_attr<'a>(node: &roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute((WORDML, name))
}

/// Paragraph texts of a cell, one line per paragraph.
fn collect_cell_text(cell: &roxmltree::Node<'_, '_>) -> String {
    cell.descendants()
        .filter(|n| is_w(n, "p"))
        .map(|p| {
            p.descendants()
                .filter(|n| is_w(n, "t"))
                .filter_map(|t| t.text())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

enum VMerge {
    Restart,
    Continue,
}

struct RawMerge {
    row: usize,
    col: usize,
    col_span: usize,
    vmerge: Option<VMerge>,
}

/// Turn per-cell merge markers into regions: every `restart` absorbs the
/// run of `continue` cells directly below it in the same grid column.
fn resolve_vmerge_spans(raw: &[RawMerge]) -> Vec<CellMerge> {
    let continues: Vec<(usize, usize)> = raw
        .iter()
        .filter(|m| matches!(m.vmerge, Some(VMerge::Continue)))
        .map(|m| (m.row, m.col))
        .collect();

    raw.iter()
        .filter_map(|m| match m.vmerge {
            Some(VMerge::Continue) => None,
            Some(VMerge::Restart) => {
                let mut row_span = 1;
                while continues.contains(&(m.row + row_span, m.col)) {
                    row_span += 1;
                }
                Some(CellMerge { row: m.row, col: m.col, row_span, col_span: m.col_span })
            }
            None => Some(CellMerge { row: m.row, col: m.col, row_span: 1, col_span: m.col_span }),
        })
        .collect()
}

fn summarize_table(index: usize, table: roxmltree::Node<'_, '_>) -> TableSummary {
    let column_widths: Vec<u32> = table
        .children()
        .filter(|n| is_w(n, "tblGrid"))
        .flat_map(|grid| grid.children().filter(|n| is_w(n, "gridCol")))
        .map(|col| w_attr(&col, "w").and_then(|v| v.parse().ok()).unwrap_or(0))
        .collect();

    let mut cells = Vec::new();
    let mut raw = Vec::new();
    for (row_idx, tr) in table.children().filter(|n| is_w(n, "tr")).enumerate() {
        let mut row = Vec::new();
        let mut col_idx = 0;
        for tc in tr.children().filter(|n| is_w(n, "tc")) {
            row.push(collect_cell_text(&tc));

            let props = tc.children().find(|n| is_w(n, "tcPr"));
            let col_span = props
                .and_then(|p| p.children().find(|n| is_w(n, "gridSpan")))
                .and_then(|g| w_attr(&g, "val"))
                .and_then(|v| v.parse().ok())
                .unwrap_or(1usize)
                .max(1);
            let vmerge = props
                .and_then(|p| p.children().find(|n| is_w(n, "vMerge")))
                .map(|v| match w_attr(&v, "val") {
                    Some("restart") => VMerge::Restart,
                    _ => VMerge::Continue,
                });

            if col_span > 1 || vmerge.is_some() {
                raw.push(RawMerge { row: row_idx, col: col_idx, col_span, vmerge });
            }
            col_idx += col_span;
        }
        cells.push(row);
    }

    TableSummary {
        index,
        rows: cells.len(),
        cols: if column_widths.is_empty() {
            cells.iter().map(Vec::len).max().unwrap_or(0)
        } else {
            column_widths.len()
        },
        column_widths,
        merges: resolve_vmerge_spans(&raw),
        cells,
    }
}

impl DocxEditor {
    #[instrument(level = "debug", skip(self, options), fields(rows = options.rows.len()))]
    pub fn insert_table(&mut self, options: TableOptions) -> Result<()> {
        if options.columns() == 0 {
            return Err(DocxError::invalid("table needs at least one row and one column"));
        }
        let fragment = options.to_xml();
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = insert_fragment(&doc, &options.position, fragment.as_bytes()).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Inserted {}x{} table at {:?}", options.rows.len(), options.columns(), options.position);
        Ok(())
    }

    pub fn update_table_cell(&mut self, table: usize, row: usize, col: usize, text: &str) -> Result<()> {
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = cells::set_cell_text(&doc, table, row, col, text).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Updated table {} cell ({}, {})", table, row, col);
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn merge_cells_horizontal(&mut self, table: usize, row: usize, start_col: usize, end_col: usize) -> Result<()> {
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = cells::merge_horizontal(&doc, table, row, start_col, end_col).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Merged table {} row {} columns {}..={}", table, row, start_col, end_col);
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn merge_cells_vertical(&mut self, table: usize, start_row: usize, end_row: usize, col: usize) -> Result<()> {
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = cells::merge_vertical(&doc, table, start_row, end_row, col).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Merged table {} column {} rows {}..={}", table, col, start_row, end_row);
        Ok(())
    }

    pub fn delete_table(&mut self, table: usize) -> Result<()> {
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = cells::delete_table(&doc, table).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Deleted table {}", table);
        Ok(())
    }

    pub fn table_count(&self) -> Result<usize> {
        cells::count_tables(self.document()?).in_part(DOCUMENT_PART)
    }

    pub fn cell_text(&self, table: usize, row: usize, col: usize) -> Result<String> {
        cells::cell_text(self.document()?, table, row, col).in_part(DOCUMENT_PART)
    }

    /// Every table in document order, nested tables included.
    pub fn tables(&self) -> Result<Vec<TableSummary>> {
        let text = std::str::from_utf8(self.document()?)
            .map_err(|_| DocxError::Encoding(DOCUMENT_PART.to_string()))?;
        let doc = roxmltree::Document::parse(text).map_err(|source| DocxError::Xml {
            part: DOCUMENT_PART.to_string(),
            source,
        })?;
        Ok(doc
            .descendants()
            .filter(|n| is_w(n, "tbl"))
            .enumerate()
            .map(|(i, table)| summarize_table(i + 1, table))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect()
    }

    fn editor_with_table() -> DocxEditor {
        let mut editor = DocxEditor::new_blank().unwrap();
        let mut options = TableOptions::new(grid(&[&["A", "B", "C"], &["1", "2", "3"], &["4", "5", "6"]]));
        options.header = true;
        editor.insert_table(options).unwrap();
        editor
    }

    #[test]
    fn inserted_table_is_summarized() {
        let editor = editor_with_table();
        let tables = editor.tables().unwrap();
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!((t.index, t.rows, t.cols), (1, 3, 3));
        assert_eq!(t.column_widths, vec![3120, 3120, 3120]);
        assert_eq!(t.cells[1], vec!["1", "2", "3"]);
        assert!(t.merges.is_empty());
    }

    #[test]
    fn short_rows_are_padded() {
        let mut editor = DocxEditor::new_blank().unwrap();
        editor.insert_table(TableOptions::new(grid(&[&["a", "b"], &["c"]]))).unwrap();
        assert_eq!(editor.tables().unwrap()[0].cells[1], vec!["c", ""]);
    }

    #[test]
    fn merges_are_resolved_into_regions() {
        let mut editor = editor_with_table();
        editor.merge_cells_horizontal(1, 1, 1, 2).unwrap();
        editor.merge_cells_vertical(1, 2, 3, 3).unwrap();

        let t = &editor.tables().unwrap()[0];
        assert_eq!(
            t.merges,
            vec![
                CellMerge { row: 0, col: 0, row_span: 1, col_span: 2 },
                CellMerge { row: 1, col: 2, row_span: 2, col_span: 1 },
            ]
        );
        assert_eq!(t.cells[0], vec!["A", "C"]);
        assert_eq!(t.cells[2], vec!["4", "5", "6"]);
    }

    #[test]
    fn cell_update_and_delete() {
        let mut editor = editor_with_table();
        editor.update_table_cell(1, 2, 2, "two & more").unwrap();
        assert_eq!(editor.cell_text(1, 2, 2).unwrap(), "two & more");

        editor.delete_table(1).unwrap();
        assert_eq!(editor.table_count().unwrap(), 0);
        let err = editor.delete_table(1).unwrap_err();
        assert_eq!(err.kind(), Some(docx_splice_core::ErrorKind::NotFound));
    }

    #[test]
    fn empty_table_is_rejected() {
        let mut editor = DocxEditor::new_blank().unwrap();
        assert!(editor.insert_table(TableOptions::default()).is_err());
    }
}
