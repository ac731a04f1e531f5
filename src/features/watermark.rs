//! Text watermark drawn as a VML shape in the default header.

use std::sync::LazyLock;

use docx_splice_core::markup::{attribute, escape, insert_before_close, next_start_tag};
use docx_splice_core::namespaces::{
    content_types as ct, ensure_namespaces, rel_types, tags, OFFICE, OFFICE_RELATIONSHIPS, VML, WORDML,
};
use docx_splice_core::relationships::{relationship_target, resolve_target};
use docx_splice_core::{next_part_index, rels_path_for, PartSeries, SpliceError, DOCUMENT_PART};
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::page::{ensure_final_section, section_content_start};
use crate::features::{document, document_relative, link, register_override, require_text, XML_DECLARATION};

static HEADER_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:headerReference\b[^>]*>").expect("static header pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkOptions {
    pub text: String,
    pub font: String,
    /// `RRGGBB`, with or without a leading `#`.
    pub color: String,
    /// 0.0 to 1.0; out-of-range values are clamped.
    pub opacity: f64,
    /// Rotate the text 315 degrees.
    pub diagonal: bool,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: "DRAFT".to_string(),
            font: "Calibri".to_string(),
            color: "C0C0C0".to_string(),
            opacity: 0.5,
            diagonal: true,
        }
    }
}

impl WatermarkOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn color(&self) -> Result<String> {
        let hex = self.color.trim_start_matches('#');
        if hex.is_empty() {
            return Ok("C0C0C0".to_string());
        }
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DocxError::invalid(format!("color {:?} is not RRGGBB", self.color)));
        }
        Ok(hex.to_ascii_uppercase())
    }

    fn opacity(&self) -> f64 {
        if self.opacity.is_nan() || self.opacity <= 0.0 {
            0.5
        } else {
            self.opacity.min(1.0)
        }
    }

    fn to_xml(&self) -> Result<String> {
        let color = self.color()?;
        let font = if self.font.trim().is_empty() { "Calibri" } else { self.font.as_str() };
        let rotation = if self.diagonal { "rotation:315;" } else { "" };
        Ok(format!(
            concat!(
                r#"<w:p><w:pPr><w:pStyle w:val="Header"/></w:pPr><w:r><w:rPr><w:noProof/></w:rPr><w:pict>"#,
                r#"<v:shapetype id="_x0000_t136" coordsize="21600,21600" o:spt="136" adj="10800" path="m@7,l@8,m@5,21600l@6,21600e">"#,
                "<v:formulas>",
                r#"<v:f eqn="sum #0 0 10800"/><v:f eqn="prod #0 2 1"/><v:f eqn="sum 21600 0 @1"/>"#,
                r#"<v:f eqn="sum 0 0 @2"/><v:f eqn="sum 21600 0 @3"/><v:f eqn="if @0 @3 0"/>"#,
                r#"<v:f eqn="if @0 21600 @1"/><v:f eqn="if @0 0 @2"/><v:f eqn="if @0 @4 21600"/>"#,
                r#"<v:f eqn="mid @5 @6"/><v:f eqn="mid @8 @5"/><v:f eqn="mid @7 @8"/>"#,
                r#"<v:f eqn="mid @6 @7"/><v:f eqn="sum @6 0 @5"/>"#,
                "</v:formulas>",
                r#"<v:path textpathok="t" o:connecttype="custom" o:connectlocs="@9,0;@10,10800;@11,21600;@12,10800" o:connectangles="270,180,90,0"/>"#,
                r#"<v:textpath on="t" fitshape="t"/>"#,
                r##"<v:handles><v:h position="#0,bottomRight" xrange="6629,14971"/></v:handles>"##,
                r#"<o:lock v:ext="edit" text="t" shapetype="t"/>"#,
                "</v:shapetype>",
                r##"<v:shape id="PowerPlusWaterMarkObject" o:spid="_x0000_s2049" type="#_x0000_t136" "##,
                r#"style="position:absolute;margin-left:0;margin-top:0;width:468pt;height:117pt;{rotation}"#,
                "z-index:-251658752;mso-position-horizontal:center;mso-position-horizontal-relative:margin;",
                r##"mso-position-vertical:center;mso-position-vertical-relative:margin" o:allowincell="f" fillcolor="#{color}" stroked="f">"##,
                r#"<v:fill opacity="{opacity:.2}"/>"#,
                r#"<v:textpath style="font-family:&quot;{font}&quot;;font-size:1pt" string="{text}"/>"#,
                "</v:shape></w:pict></w:r></w:p>"
            ),
            rotation = rotation,
            color = color,
            opacity = self.opacity(),
            font = escape(font),
            text = escape(&self.text),
        ))
    }
}

fn new_header(watermark: &str) -> Vec<u8> {
    format!(
        r#"{XML_DECLARATION}<w:hdr xmlns:w="{WORDML}" xmlns:r="{OFFICE_RELATIONSHIPS}" xmlns:v="{VML}" xmlns:o="{OFFICE}">{watermark}</w:hdr>"#
    )
    .into_bytes()
}

/// Relationship id of the document's default header reference, if any.
fn default_header_reference(doc: &[u8]) -> Option<String> {
    HEADER_REFERENCE
        .find_iter(doc)
        .map(|m| m.as_bytes())
        .find(|tag| attribute(tag, "w:type") == Some("default"))
        .and_then(|tag| attribute(tag, "r:id").map(str::to_string))
}

/// Put `paragraph` first in an existing header.
fn prepend_to_header(header: &mut Vec<u8>, paragraph: &str) -> docx_splice_core::Result<()> {
    ensure_namespaces(header, tags::HEADER_ROOT, &[("v", VML), ("o", OFFICE)])?;
    let open = next_start_tag(header, tags::HEADER_ROOT, 0)?
        .ok_or_else(|| SpliceError::malformed("no <w:hdr> element"))?;
    if open.self_closing {
        return insert_before_close(header, tags::HEADER_ROOT, paragraph.as_bytes());
    }
    header.splice(open.end..open.end, paragraph.bytes());
    Ok(())
}

impl DocxEditor {
    /// Add a text watermark to the default header, creating the header when
    /// the document has none. Returns the header part that received it.
    #[instrument(level = "debug", skip(self, options), fields(text = %options.text))]
    pub fn set_text_watermark(&mut self, options: WatermarkOptions) -> Result<String> {
        require_text("watermark text", &options.text)?;
        let watermark = options.to_xml()?;

        let header = self.edit(|tx| {
            let mut doc = document(tx)?;
            let existing = match default_header_reference(&doc) {
                Some(id) => {
                    let rels_path = rels_path_for(DOCUMENT_PART);
                    let rels = tx.require(&rels_path)?;
                    relationship_target(rels, &id)
                        .in_part(&rels_path)?
                        .map(|target| resolve_target(DOCUMENT_PART, &target))
                        .filter(|part| tx.contains(part))
                }
                None => None,
            };

            if let Some(part) = existing {
                debug!("Adding watermark to existing header {}", part);
                let mut header = tx.require(&part)?.to_vec();
                prepend_to_header(&mut header, &watermark).in_part(&part)?;
                tx.put(part.clone(), header);
                return Ok(part);
            }

            let index = next_part_index(tx.part_names(), PartSeries::HEADER);
            let part = PartSeries::HEADER.path(index);
            tx.put(part.clone(), new_header(&watermark));
            let rel_id = link(tx, DOCUMENT_PART, document_relative(&part), rel_types::HEADER)?;
            register_override(tx, &part, ct::HEADER)?;

            ensure_namespaces(&mut doc, "w:document", &[("r", OFFICE_RELATIONSHIPS)]).in_part(DOCUMENT_PART)?;
            let section = ensure_final_section(&mut doc).in_part(DOCUMENT_PART)?;
            let at = section_content_start(&doc, section).in_part(DOCUMENT_PART)?;
            let reference = format!(r#"<w:headerReference w:type="default" r:id="{rel_id}"/>"#);
            doc.splice(at..at, reference.bytes());
            tx.put(DOCUMENT_PART, doc);
            Ok(part)
        })?;
        info!("Set watermark {:?} in {}", options.text, header);
        Ok(header)
    }
}
