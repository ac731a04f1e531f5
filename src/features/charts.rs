//! Native charts: a chart part, its embedded workbook and an inline drawing
//! in the body.

use docx_splice_core::markup::escape;
use docx_splice_core::namespaces::{
    content_types as ct, rel_types, CHART, DRAWINGML, OFFICE_RELATIONSHIPS, WORDPROCESSING_DRAWING,
};
use docx_splice_core::namespaces::ensure_namespaces;
use docx_splice_core::planner::insert_fragment;
use docx_splice_core::{next_id, next_part_index, IdNamespace, InsertPosition, PartSeries, DOCUMENT_PART};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::media::{count_paragraphs_with, remove_nth_paragraph_with};
use crate::features::workbook::{self, column_letter, Column, SHEET_NAME};
use crate::features::{document, document_relative, link, register_default, register_override, XML_DECLARATION};

/// Default inline size, in EMU (about 16.9 x 9.3 cm).
pub const DEFAULT_CHART_WIDTH: u64 = 6_099_523;
pub const DEFAULT_CHART_HEIGHT: u64 = 3_340_467;

const CATEGORY_AXIS_ID: u32 = 2_071_991_400;
const VALUE_AXIS_ID: u32 = 2_071_991_240;

/// Marker of a chart drawing inside a paragraph.
const CHART_MARKER: &[u8] = b"<c:chart ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Vertical bars.
    #[default]
    Column,
    /// Horizontal bars.
    Bar,
    Line,
    Pie,
    Area,
}

impl ChartKind {
    fn has_axes(self) -> bool {
        self != ChartKind::Pie
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesOptions {
    pub name: String,
    /// One value per category.
    pub values: Vec<f64>,
    /// `RRGGBB`, with or without a leading `#`.
    pub color: Option<String>,
}

impl SeriesOptions {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub kind: ChartKind,
    pub title: Option<String>,
    pub categories: Vec<String>,
    pub series: Vec<SeriesOptions>,
    pub position: InsertPosition,
    /// EMU.
    pub width: u64,
    /// EMU.
    pub height: u64,
    pub legend: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            kind: ChartKind::default(),
            title: None,
            categories: Vec::new(),
            series: Vec::new(),
            position: InsertPosition::End,
            width: DEFAULT_CHART_WIDTH,
            height: DEFAULT_CHART_HEIGHT,
            legend: true,
        }
    }
}

impl ChartOptions {
    pub fn new(kind: ChartKind, categories: Vec<String>, series: Vec<SeriesOptions>) -> Self {
        Self {
            kind,
            categories,
            series,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(DocxError::invalid("chart needs at least one category"));
        }
        if self.series.is_empty() {
            return Err(DocxError::invalid("chart needs at least one series"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(DocxError::invalid("chart size must be positive"));
        }
        for series in &self.series {
            if series.values.len() != self.categories.len() {
                return Err(DocxError::invalid(format!(
                    "series {:?} has {} values for {} categories",
                    series.name,
                    series.values.len(),
                    self.categories.len()
                )));
            }
            if series.values.iter().any(|v| !v.is_finite()) {
                return Err(DocxError::invalid(format!("series {:?} has a non-finite value", series.name)));
            }
            if let Some(color) = &series.color {
                normalize_color(color)?;
            }
        }
        Ok(())
    }
}

fn normalize_color(color: &str) -> Result<String> {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DocxError::invalid(format!("color {color:?} is not RRGGBB")));
    }
    Ok(hex.to_ascii_uppercase())
}

fn title_xml(title: &str) -> String {
    format!(
        concat!(
            "<c:title><c:tx><c:rich><a:bodyPr/><a:lstStyle/><a:p><a:pPr><a:defRPr/></a:pPr>",
            r#"<a:r><a:rPr lang="en-US"/><a:t>{}</a:t></a:r></a:p></c:rich></c:tx>"#,
            r#"<c:layout/><c:overlay val="0"/></c:title>"#
        ),
        escape(title)
    )
}

fn series_xml(kind: ChartKind, index: usize, series: &SeriesOptions, categories: &[String]) -> String {
    let col = column_letter(index + 2);
    let last_row = categories.len() + 1;
    let mut xml = format!(
        concat!(
            r#"<c:ser><c:idx val="{i}"/><c:order val="{i}"/>"#,
            r#"<c:tx><c:strRef><c:f>{sheet}!${col}$1</c:f><c:strCache><c:ptCount val="1"/>"#,
            r#"<c:pt idx="0"><c:v>{name}</c:v></c:pt></c:strCache></c:strRef></c:tx>"#
        ),
        i = index,
        sheet = SHEET_NAME,
        col = col,
        name = escape(&series.name),
    );
    if let Some(color) = series.color.as_deref().and_then(|c| normalize_color(c).ok()) {
        xml.push_str(&format!(r#"<c:spPr><a:solidFill><a:srgbClr val="{color}"/></a:solidFill></c:spPr>"#));
    }
    if matches!(kind, ChartKind::Line) {
        xml.push_str(r#"<c:marker><c:symbol val="none"/></c:marker>"#);
    }

    xml.push_str(&format!(
        r#"<c:cat><c:strRef><c:f>{SHEET_NAME}!$A$2:$A${last_row}</c:f><c:strCache><c:ptCount val="{}"/>"#,
        categories.len()
    ));
    for (i, category) in categories.iter().enumerate() {
        xml.push_str(&format!(r#"<c:pt idx="{i}"><c:v>{}</c:v></c:pt>"#, escape(category)));
    }
    xml.push_str("</c:strCache></c:strRef></c:cat>");

    xml.push_str(&format!(
        concat!(
            r#"<c:val><c:numRef><c:f>{sheet}!${col}$2:${col}${last}</c:f>"#,
            r#"<c:numCache><c:formatCode>General</c:formatCode><c:ptCount val="{count}"/>"#
        ),
        sheet = SHEET_NAME,
        col = col,
        last = last_row,
        count = series.values.len(),
    ));
    for (i, value) in series.values.iter().enumerate() {
        xml.push_str(&format!(r#"<c:pt idx="{i}"><c:v>{value}</c:v></c:pt>"#));
    }
    xml.push_str("</c:numCache></c:numRef></c:val>");
    if matches!(kind, ChartKind::Line) {
        xml.push_str(r#"<c:smooth val="0"/>"#);
    }
    xml.push_str("</c:ser>");
    xml
}

fn data_labels(kind: ChartKind) -> &'static str {
    if kind == ChartKind::Pie {
        concat!(
            r#"<c:dLbls><c:showLegendKey val="0"/><c:showVal val="0"/><c:showCatName val="0"/>"#,
            r#"<c:showSerName val="0"/><c:showPercent val="1"/><c:showBubbleSize val="0"/>"#,
            r#"<c:showLeaderLines val="1"/></c:dLbls>"#
        )
    } else {
        concat!(
            r#"<c:dLbls><c:showLegendKey val="0"/><c:showVal val="0"/><c:showCatName val="0"/>"#,
            r#"<c:showSerName val="0"/><c:showPercent val="0"/><c:showBubbleSize val="0"/></c:dLbls>"#
        )
    }
}

fn axis_ids() -> String {
    format!(r#"<c:axId val="{CATEGORY_AXIS_ID}"/><c:axId val="{VALUE_AXIS_ID}"/>"#)
}

fn plot_xml(options: &ChartOptions) -> String {
    let series: String = options
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| series_xml(options.kind, i, s, &options.categories))
        .collect();
    let labels = data_labels(options.kind);

    match options.kind {
        ChartKind::Column | ChartKind::Bar => {
            let dir = if options.kind == ChartKind::Bar { "bar" } else { "col" };
            format!(
                concat!(
                    r#"<c:barChart><c:barDir val="{dir}"/><c:grouping val="clustered"/><c:varyColors val="0"/>"#,
                    r#"{series}{labels}<c:gapWidth val="150"/><c:overlap val="0"/>{axes}</c:barChart>"#
                ),
                dir = dir,
                series = series,
                labels = labels,
                axes = axis_ids(),
            )
        }
        ChartKind::Line => format!(
            r#"<c:lineChart><c:grouping val="standard"/><c:varyColors val="0"/>{series}{labels}<c:marker val="1"/>{}</c:lineChart>"#,
            axis_ids()
        ),
        ChartKind::Area => format!(
            r#"<c:areaChart><c:grouping val="standard"/><c:varyColors val="0"/>{series}{labels}{}</c:areaChart>"#,
            axis_ids()
        ),
        ChartKind::Pie => format!(
            r#"<c:pieChart><c:varyColors val="1"/>{series}{labels}<c:firstSliceAng val="0"/></c:pieChart>"#
        ),
    }
}

fn axes_xml() -> String {
    format!(
        concat!(
            r#"<c:catAx><c:axId val="{cat}"/><c:scaling><c:orientation val="minMax"/></c:scaling>"#,
            r#"<c:delete val="0"/><c:axPos val="b"/><c:numFmt formatCode="General" sourceLinked="0"/>"#,
            r#"<c:majorTickMark val="out"/><c:minorTickMark val="none"/><c:tickLblPos val="nextTo"/>"#,
            r#"<c:crossAx val="{val}"/><c:crosses val="autoZero"/><c:auto val="1"/>"#,
            r#"<c:lblAlgn val="ctr"/><c:lblOffset val="100"/><c:noMultiLvlLbl val="0"/></c:catAx>"#,
            r#"<c:valAx><c:axId val="{val}"/><c:scaling><c:orientation val="minMax"/></c:scaling>"#,
            r#"<c:delete val="0"/><c:axPos val="l"/><c:majorGridlines/>"#,
            r#"<c:numFmt formatCode="General" sourceLinked="0"/><c:majorTickMark val="out"/>"#,
            r#"<c:minorTickMark val="none"/><c:tickLblPos val="nextTo"/><c:crossAx val="{cat}"/>"#,
            r#"<c:crosses val="autoZero"/><c:crossBetween val="between"/></c:valAx>"#
        ),
        cat = CATEGORY_AXIS_ID,
        val = VALUE_AXIS_ID,
    )
}

/// The `chartSpace` part. `workbook_rel` is the relationship id of the
/// embedded workbook in the chart's own `.rels`.
fn chart_space(options: &ChartOptions, workbook_rel: &str) -> String {
    let mut xml = format!(
        concat!(
            r#"{decl}<c:chartSpace xmlns:c="{c}" xmlns:a="{a}" xmlns:r="{r}">"#,
            r#"<c:date1904 val="0"/><c:lang val="en-US"/><c:roundedCorners val="0"/><c:chart>"#
        ),
        decl = XML_DECLARATION,
        c = CHART,
        a = DRAWINGML,
        r = OFFICE_RELATIONSHIPS,
    );
    if let Some(title) = options.title.as_deref().filter(|t| !t.is_empty()) {
        xml.push_str(&title_xml(title));
        xml.push_str(r#"<c:autoTitleDeleted val="0"/>"#);
    } else {
        xml.push_str(r#"<c:autoTitleDeleted val="1"/>"#);
    }
    xml.push_str("<c:plotArea><c:layout/>");
    xml.push_str(&plot_xml(options));
    if options.kind.has_axes() {
        xml.push_str(&axes_xml());
    }
    xml.push_str("</c:plotArea>");
    if options.legend {
        xml.push_str(r#"<c:legend><c:legendPos val="r"/><c:layout/><c:overlay val="0"/></c:legend>"#);
    }
    xml.push_str(r#"<c:plotVisOnly val="1"/><c:dispBlanksAs val="gap"/></c:chart>"#);
    xml.push_str(&format!(
        r#"<c:externalData r:id="{workbook_rel}"><c:autoUpdate val="0"/></c:externalData></c:chartSpace>"#
    ));
    xml
}

fn drawing_paragraph(doc_pr_id: u32, index: u32, rel_id: &str, width: u64, height: u64) -> String {
    format!(
        concat!(
            r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="15875" b="12700"/>"#,
            r#"<wp:docPr id="{id}" name="Chart {index}"/><wp:cNvGraphicFramePr/>"#,
            r#"<a:graphic xmlns:a="{a}"><a:graphicData uri="{c}">"#,
            r#"<c:chart xmlns:c="{c}" xmlns:r="{r}" r:id="{rel}"/>"#,
            "</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"
        ),
        cx = width,
        cy = height,
        id = doc_pr_id,
        index = index,
        a = DRAWINGML,
        c = CHART,
        r = OFFICE_RELATIONSHIPS,
        rel = rel_id,
    )
}

impl DocxEditor {
    /// Insert a chart backed by an embedded workbook. Returns the chart part
    /// index (`N` in `word/charts/chartN.xml`).
    #[instrument(level = "debug", skip(self, options), fields(kind = ?options.kind))]
    pub fn insert_chart(&mut self, options: ChartOptions) -> Result<u32> {
        options.validate()?;
        let columns: Vec<Column<'_>> = options
            .series
            .iter()
            .map(|s| Column {
                name: &s.name,
                values: &s.values,
            })
            .collect();
        let xlsx = workbook::build(&options.categories, &columns)?;

        let index = self.edit(|tx| {
            let names = tx.part_names();
            let index = next_part_index(names.iter().copied(), PartSeries::CHART);
            let workbook_index = next_part_index(names.iter().copied(), PartSeries::EMBEDDED_WORKBOOK);
            let chart_path = PartSeries::CHART.path(index);
            let workbook_path = PartSeries::EMBEDDED_WORKBOOK.path(workbook_index);
            debug!("Allocated {} and {}", chart_path, workbook_path);

            let workbook_target = format!("../{}", document_relative(&workbook_path));
            let workbook_rel = link(tx, &chart_path, &workbook_target, rel_types::PACKAGE)?;
            tx.put(workbook_path.clone(), xlsx);
            tx.put(chart_path.clone(), chart_space(&options, &workbook_rel).into_bytes());

            let chart_rel = link(tx, DOCUMENT_PART, document_relative(&chart_path), rel_types::CHART)?;
            register_override(tx, &chart_path, ct::CHART)?;
            register_default(tx, "xlsx", ct::XLSX)?;

            let mut doc = document(tx)?;
            ensure_namespaces(
                &mut doc,
                "w:document",
                &[
                    ("wp", WORDPROCESSING_DRAWING),
                    ("a", DRAWINGML),
                    ("c", CHART),
                    ("r", OFFICE_RELATIONSHIPS),
                ],
            )
            .in_part(DOCUMENT_PART)?;
            let doc_pr_id = next_id(&doc, IdNamespace::DrawingObject).in_part(DOCUMENT_PART)?;
            let fragment = drawing_paragraph(doc_pr_id, index, &chart_rel, options.width, options.height);
            let updated = insert_fragment(&doc, &options.position, fragment.as_bytes()).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(index)
        })?;
        info!("Inserted {:?} chart {} at {:?}", options.kind, index, options.position);
        Ok(index)
    }

    /// Remove the paragraph holding the `n`-th (1-based) chart drawing. The
    /// chart part and its workbook stay in the package.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_chart(&mut self, n: usize) -> Result<()> {
        self.edit(|tx| {
            let doc = document(tx)?;
            let updated = remove_nth_paragraph_with(&doc, CHART_MARKER, "chart", n).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Deleted chart {}", n);
        Ok(())
    }

    pub fn chart_count(&self) -> Result<usize> {
        count_paragraphs_with(self.document()?, CHART_MARKER).in_part(DOCUMENT_PART)
    }
}
