mod common;

use std::io::{Cursor, Write};

use common::{package, paragraph, CONTENT_TYPES};
use docx_splice::{ChartKind, ChartOptions, DocxEditor, DocxError, ErrorKind, ParagraphOptions, SeriesOptions};
use docx_splice_core::SpliceError;
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Settings written the way Word does, attribute order and whitespace
/// included, so a rewrite would show.
const SETTINGS: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n<w:settings xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"  ><w:zoom w:percent=\"100\"/></w:settings>";

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn sales_chart() -> ChartOptions {
    ChartOptions::new(
        ChartKind::Line,
        vec!["Q1".into(), "Q2".into()],
        vec![SeriesOptions::new("Sales", vec![4.0, 6.5])],
    )
}

#[rstest]
fn save_and_reopen_keeps_untouched_parts(temp_dir: TempDir) {
    let bytes = package(&paragraph("Hello"), &[("word/settings.xml", SETTINGS)]);
    let mut editor = DocxEditor::from_bytes(&bytes).unwrap();
    editor.insert_paragraph(ParagraphOptions::new("World")).unwrap();

    let path = temp_dir.path().join("out.docx");
    editor.save(&path).unwrap();
    let reopened = DocxEditor::open(&path).unwrap();

    assert_eq!(reopened.parts().part("word/settings.xml").unwrap(), SETTINGS);
    assert_eq!(reopened.parts().part("_rels/.rels").unwrap(), common::PACKAGE_RELS.as_bytes());
    assert_eq!(common::texts(&reopened), ["Hello", "World"]);
    assert_eq!(reopened.document().unwrap(), editor.document().unwrap());
}

#[rstest]
fn saving_over_the_input_replaces_it(temp_dir: TempDir) {
    let path = temp_dir.path().join("doc.docx");
    std::fs::write(&path, package(&paragraph("Draft"), &[])).unwrap();

    let mut editor = DocxEditor::open(&path).unwrap();
    editor.insert_paragraph(ParagraphOptions::new("Final")).unwrap();
    editor.save(&path).unwrap();

    let reopened = DocxEditor::open(&path).unwrap();
    assert_eq!(common::texts(&reopened), ["Draft", "Final"]);
    // No temporary file left next to the output.
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[test]
fn charts_skip_existing_part_names() {
    let existing: &[u8] = b"<c:chartSpace xmlns:c=\"http://schemas.openxmlformats.org/drawingml/2006/chart\"/>";
    let bytes = package(&paragraph("Figures"), &[("word/charts/chart1.xml", existing)]);
    let mut editor = DocxEditor::from_bytes(&bytes).unwrap();

    assert_eq!(editor.insert_chart(sales_chart()).unwrap(), 2);
    assert_eq!(editor.insert_chart(sales_chart()).unwrap(), 3);

    let parts = editor.parts();
    assert_eq!(parts.part("word/charts/chart1.xml").unwrap(), existing);
    assert!(parts.contains("word/charts/chart2.xml"));
    assert!(parts.contains("word/charts/chart3.xml"));
    assert!(parts.contains("word/embeddings/Microsoft_Excel_Worksheet1.xlsx"));
    assert!(parts.contains("word/embeddings/Microsoft_Excel_Worksheet2.xlsx"));
    assert!(parts.contains("word/charts/_rels/chart3.xml.rels"));

    let types = String::from_utf8(parts.part("[Content_Types].xml").unwrap().to_vec()).unwrap();
    assert_eq!(types.matches(r#"Extension="xlsx""#).count(), 1);
    assert!(types.contains(r#"PartName="/word/charts/chart3.xml""#));

    let rels = String::from_utf8(parts.part("word/_rels/document.xml.rels").unwrap().to_vec()).unwrap();
    assert!(rels.contains(r#"Target="charts/chart2.xml""#));
    assert!(rels.contains(r#"Target="charts/chart3.xml""#));
    assert_eq!(editor.chart_count().unwrap(), 2);
}

#[test]
fn rejected_chart_leaves_package_untouched() {
    let mut editor = DocxEditor::from_bytes(&package(&paragraph("Figures"), &[])).unwrap();
    let before: Vec<String> = editor.parts().part_names().map(String::from).collect();

    let mut options = sales_chart();
    options.series.push(SeriesOptions::new("Costs", vec![1.0]));
    let err = editor.insert_chart(options).unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::InvalidArgument));
    let after: Vec<String> = editor.parts().part_names().map(String::from).collect();
    assert_eq!(after, before);
}

#[test]
fn missing_document_part_is_reported() {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let err = DocxEditor::from_bytes(&bytes).unwrap_err();
    assert!(
        matches!(&err, DocxError::Splice(SpliceError::MissingPart(part)) if part == "word/document.xml"),
        "{err}"
    );
    assert_eq!(err.kind(), Some(ErrorKind::Malformed));
}

#[test]
fn non_zip_input_is_a_zip_error() {
    let err = DocxEditor::from_bytes(b"plain text, not a package").unwrap_err();
    assert!(matches!(err, DocxError::Zip(_)), "{err}");
    assert_eq!(err.kind(), None);
}

#[test]
fn blank_document_round_trips() {
    let editor = DocxEditor::new_blank().unwrap();
    let reopened = DocxEditor::from_bytes(&editor.to_bytes().unwrap()).unwrap();
    assert_eq!(reopened.document().unwrap(), editor.document().unwrap());
    assert_eq!(reopened.table_count().unwrap(), 0);
}
