//! The small xlsx package embedded behind every chart, so Word's "Edit Data"
//! opens the numbers the chart was drawn from.

use std::io::{Cursor, Write};

use docx_splice_core::markup::escape;
use docx_splice_core::namespaces::{content_types as ct, OFFICE_RELATIONSHIPS, PACKAGE_RELATIONSHIPS, SPREADSHEETML};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::features::XML_DECLARATION;

/// Name of the only worksheet; chart formulas point into it.
pub(crate) const SHEET_NAME: &str = "Sheet1";

const WORKSHEET_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const WORKBOOK_STYLES_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Spreadsheet column name for a 1-based index: 1 is `A`, 27 is `AA`.
pub(crate) fn column_letter(mut index: usize) -> String {
    let mut name = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        name.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

/// One column of chart data.
pub(crate) struct Column<'a> {
    pub name: &'a str,
    pub values: &'a [f64],
}

fn content_types() -> String {
    format!(
        concat!(
            r#"{decl}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="{rels}"/>"#,
            r#"<Default Extension="xml" ContentType="{xml}"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
            "</Types>"
        ),
        decl = XML_DECLARATION,
        rels = ct::RELATIONSHIPS,
        xml = ct::XML,
    )
}

fn package_rels() -> String {
    format!(
        concat!(
            r#"{decl}<Relationships xmlns="{pr}">"#,
            r#"<Relationship Id="rId1" Type="{office}" Target="xl/workbook.xml"/>"#,
            "</Relationships>"
        ),
        decl = XML_DECLARATION,
        pr = PACKAGE_RELATIONSHIPS,
        office = docx_splice_core::namespaces::rel_types::OFFICE_DOCUMENT,
    )
}

fn workbook() -> String {
    format!(
        r#"{XML_DECLARATION}<workbook xmlns="{SPREADSHEETML}" xmlns:r="{OFFICE_RELATIONSHIPS}"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

fn workbook_rels() -> String {
    format!(
        concat!(
            r#"{decl}<Relationships xmlns="{pr}">"#,
            r#"<Relationship Id="rId1" Type="{sheet}" Target="worksheets/sheet1.xml"/>"#,
            r#"<Relationship Id="rId2" Type="{styles}" Target="styles.xml"/>"#,
            "</Relationships>"
        ),
        decl = XML_DECLARATION,
        pr = PACKAGE_RELATIONSHIPS,
        sheet = WORKSHEET_REL,
        styles = WORKBOOK_STYLES_REL,
    )
}

fn styles() -> String {
    format!(
        concat!(
            r#"{decl}<styleSheet xmlns="{ns}"><numFmts count="0"/>"#,
            r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
            r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
            r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
            r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellXfs>"#,
            "</styleSheet>"
        ),
        decl = XML_DECLARATION,
        ns = SPREADSHEETML,
    )
}

/// Categories down column A, one series per column from B, series names in
/// row 1.
pub(crate) fn sheet(categories: &[String], columns: &[Column<'_>]) -> String {
    let mut xml = format!(r#"{XML_DECLARATION}<worksheet xmlns="{SPREADSHEETML}" xmlns:r="{OFFICE_RELATIONSHIPS}"><sheetData>"#);
    xml.push_str(r#"<row r="1"><c r="A1" t="str"><v></v></c>"#);
    for (i, column) in columns.iter().enumerate() {
        let col = column_letter(i + 2);
        xml.push_str(&format!(r#"<c r="{col}1" t="str"><v>{}</v></c>"#, escape(column.name)));
    }
    xml.push_str("</row>");

    for (i, category) in categories.iter().enumerate() {
        let row = i + 2;
        xml.push_str(&format!(r#"<row r="{row}"><c r="A{row}" t="str"><v>{}</v></c>"#, escape(category)));
        for (j, column) in columns.iter().enumerate() {
            let col = column_letter(j + 2);
            let value = column.values.get(i).copied().unwrap_or_default();
            xml.push_str(&format!(r#"<c r="{col}{row}"><v>{value}</v></c>"#));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Zip the workbook in memory.
pub(crate) fn build(categories: &[String], columns: &[Column<'_>]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let entries = [
        ("[Content_Types].xml", content_types()),
        ("_rels/.rels", package_rels()),
        ("xl/workbook.xml", workbook()),
        ("xl/_rels/workbook.xml.rels", workbook_rels()),
        ("xl/worksheets/sheet1.xml", sheet(categories, columns)),
        ("xl/styles.xml", styles()),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}
