//! Page numbering on the document's final section.

use docx_splice_core::locator::first_element;
use docx_splice_core::markup::{close_tag, next_start_tag, rfind, splice, StartTag};
use docx_splice_core::namespaces::tags;
use docx_splice_core::planner::{body_content, final_section_properties};
use docx_splice_core::{SpliceError, Span, DOCUMENT_PART};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::document;

const PAGE_NUMBER_TYPE: &str = "w:pgNumType";

/// `sectPr` children that come after `<w:pgNumType>`.
const AFTER_PAGE_NUMBER_TYPE: &[&str] = &[
    "w:cols",
    "w:formProt",
    "w:vAlign",
    "w:noEndnote",
    "w:titlePg",
    "w:textDirection",
    "w:bidi",
    "w:rtlGutter",
    "w:docGrid",
    "w:printerSettings",
    "w:sectPrChange",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageNumberFormat {
    #[default]
    Decimal,
    UpperRoman,
    LowerRoman,
    UpperLetter,
    LowerLetter,
}

impl PageNumberFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PageNumberFormat::Decimal => "decimal",
            PageNumberFormat::UpperRoman => "upperRoman",
            PageNumberFormat::LowerRoman => "lowerRoman",
            PageNumberFormat::UpperLetter => "upperLetter",
            PageNumberFormat::LowerLetter => "lowerLetter",
        }
    }
}

impl std::str::FromStr for PageNumberFormat {
    type Err = DocxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "decimal" => Ok(Self::Decimal),
            "upperroman" => Ok(Self::UpperRoman),
            "lowerroman" => Ok(Self::LowerRoman),
            "upperletter" => Ok(Self::UpperLetter),
            "lowerletter" => Ok(Self::LowerLetter),
            _ => Err(DocxError::invalid(format!("unknown page number format {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageNumberOptions {
    /// First page number of the section; `None` continues from the previous
    /// section.
    pub start: Option<u32>,
    pub format: PageNumberFormat,
}

impl PageNumberOptions {
    fn to_xml(self) -> String {
        match self.start {
            Some(start) => format!(r#"<w:pgNumType w:start="{start}" w:fmt="{}"/>"#, self.format.as_str()),
            None => format!(r#"<w:pgNumType w:fmt="{}"/>"#, self.format.as_str()),
        }
    }
}

/// The `<w:sectPr ...>` start tag that opens `section`.
fn section_start_tag(doc: &[u8], section: Span) -> docx_splice_core::Result<StartTag> {
    next_start_tag(doc, tags::SECTION_PROPS, section.start)?
        .filter(|open| open.start == section.start)
        .ok_or_else(|| SpliceError::malformed("section properties without a start tag"))
}

/// Span of the body's final `<w:sectPr>`, adding an empty one before
/// `</w:body>` when there is none. A self-closing `<w:sectPr/>` is rewritten
/// as a start and end tag pair so children can go inside it.
pub(crate) fn ensure_final_section(doc: &mut Vec<u8>) -> docx_splice_core::Result<Span> {
    if let Some(span) = final_section_properties(doc)? {
        let open = section_start_tag(doc, span)?;
        if !open.self_closing {
            return Ok(span);
        }
        let mut expanded = doc[open.start..open.end - 2].trim_ascii_end().to_vec();
        expanded.push(b'>');
        expanded.extend_from_slice(&close_tag(tags::SECTION_PROPS));
        let end = span.start + expanded.len();
        debug!("Expanding self-closing final section properties");
        doc.splice(span.start..span.end, expanded);
        return Ok(Span::new(span.start, end));
    }
    let at = body_content(doc)?.end;
    let empty = b"<w:sectPr></w:sectPr>";
    debug!("Adding final section properties");
    doc.splice(at..at, empty.iter().copied());
    Ok(Span::new(at, at + empty.len()))
}

/// Offset just after the `<w:sectPr ...>` start tag of `section`.
pub(crate) fn section_content_start(doc: &[u8], section: Span) -> docx_splice_core::Result<usize> {
    let open = section_start_tag(doc, section)?;
    if open.self_closing {
        return Err(SpliceError::malformed("self-closing section properties have no content"));
    }
    Ok(open.end)
}

/// Offset of the `</w:sectPr>` that closes `section`.
fn section_content_end(doc: &[u8], section: Span) -> docx_splice_core::Result<usize> {
    rfind(section.slice(doc), &close_tag(tags::SECTION_PROPS))
        .map(|at| section.start + at)
        .ok_or_else(|| SpliceError::malformed("section properties are never closed"))
}

fn with_page_number_type(doc: &[u8], section: Span, element: &str) -> docx_splice_core::Result<Vec<u8>> {
    let inner = Span::new(section_content_start(doc, section)?, section_content_end(doc, section)?);

    if let Some(existing) = first_element(&doc[..inner.end], PAGE_NUMBER_TYPE, inner.start)? {
        return Ok(splice(doc, existing.start, existing.end, element.as_bytes()));
    }
    let following = AFTER_PAGE_NUMBER_TYPE
        .iter()
        .map(|tag| next_start_tag(&doc[..inner.end], tag, inner.start))
        .collect::<docx_splice_core::Result<Vec<_>>>()?;
    let at = following.into_iter().flatten().map(|tag| tag.start).min().unwrap_or(inner.end);
    Ok(splice(doc, at, at, element.as_bytes()))
}

impl DocxEditor {
    /// Set the numbering format (and optionally the start) of the final
    /// section, replacing any existing `<w:pgNumType>`.
    #[instrument(level = "debug", skip(self))]
    pub fn set_page_numbering(&mut self, options: PageNumberOptions) -> Result<()> {
        let element = options.to_xml();
        self.edit(|tx| {
            let mut doc = document(tx)?;
            let section = ensure_final_section(&mut doc).in_part(DOCUMENT_PART)?;
            let updated = with_page_number_type(&doc, section, &element).in_part(DOCUMENT_PART)?;
            tx.put(DOCUMENT_PART, updated);
            Ok(())
        })?;
        info!("Set page numbering to {} starting at {:?}", options.format.as_str(), options.start);
        Ok(())
    }
}
