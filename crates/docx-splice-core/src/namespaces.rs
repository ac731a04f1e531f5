//! Namespace URIs, relationship types, content types and element names used
//! across the package.

use crate::error::{Result, SpliceError};
use crate::markup::{attribute, escape, next_start_tag};

pub const WORDML: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const OFFICE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
pub const DRAWINGML: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const CHART: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
pub const PICTURE: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
pub const WORDPROCESSING_DRAWING: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const SPREADSHEETML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const VML: &str = "urn:schemas-microsoft-com:vml";
pub const OFFICE: &str = "urn:schemas-microsoft-com:office:office";

/// Relationship type URIs.
pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const COMMENTS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
    pub const FOOTNOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footnotes";
    pub const ENDNOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/endnotes";
    pub const HEADER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
    pub const CHART: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chart";
    pub const PACKAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/package";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
}

/// Content type strings.
pub mod content_types {
    pub const RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";
    pub const DOCUMENT: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
    pub const STYLES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
    pub const COMMENTS: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.comments+xml";
    pub const FOOTNOTES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.footnotes+xml";
    pub const ENDNOTES: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.endnotes+xml";
    pub const HEADER: &str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";
    pub const CHART: &str = "application/vnd.openxmlformats-officedocument.drawingml.chart+xml";
    pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
}

/// Qualified element names as they appear in WordprocessingML parts.
pub mod tags {
    pub const BODY: &str = "w:body";
    pub const PARAGRAPH: &str = "w:p";
    pub const PARAGRAPH_PROPS: &str = "w:pPr";
    pub const RUN: &str = "w:r";
    pub const RUN_PROPS: &str = "w:rPr";
    pub const TEXT: &str = "w:t";
    pub const DELETED_TEXT: &str = "w:delText";
    pub const TABLE: &str = "w:tbl";
    pub const ROW: &str = "w:tr";
    pub const CELL: &str = "w:tc";
    pub const CELL_PROPS: &str = "w:tcPr";
    pub const GRID_SPAN: &str = "w:gridSpan";
    pub const VMERGE: &str = "w:vMerge";
    pub const SECTION_PROPS: &str = "w:sectPr";
    pub const INSERTED: &str = "w:ins";
    pub const DELETED: &str = "w:del";
    pub const DRAWING: &str = "w:drawing";
    pub const HEADER_ROOT: &str = "w:hdr";
}

/// Declare `xmlns:prefix="uri"` on the first `root` start tag for every pair
/// not already declared there. Returns whether the buffer changed.
///
/// An existing declaration of the prefix is left alone even if it binds a
/// different URI.
pub fn ensure_namespaces(buf: &mut Vec<u8>, root: &str, declarations: &[(&str, &str)]) -> Result<bool> {
    let open = next_start_tag(buf, root, 0)?
        .ok_or_else(|| SpliceError::malformed(format!("no <{root}> element")))?;
    let tag = &buf[open.start..open.end];
    let mut added = String::new();
    for (prefix, uri) in declarations {
        let name = format!("xmlns:{prefix}");
        if attribute(tag, &name).is_some() || added.contains(&format!(" {name}=")) {
            continue;
        }
        added.push_str(&format!(" {name}=\"{}\"", escape(uri)));
    }
    if added.is_empty() {
        return Ok(false);
    }
    let at = if open.self_closing { open.end - 2 } else { open.end - 1 };
    buf.splice(at..at, added.into_bytes());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_prefixes_are_declared_once() {
        let mut hdr = format!(r#"<w:hdr xmlns:w="{WORDML}"><w:p/></w:hdr>"#).into_bytes();
        assert!(ensure_namespaces(&mut hdr, tags::HEADER_ROOT, &[("w", WORDML), ("v", VML), ("o", OFFICE)]).unwrap());
        let expected = format!(r#"<w:hdr xmlns:w="{WORDML}" xmlns:v="{VML}" xmlns:o="{OFFICE}"><w:p/></w:hdr>"#);
        assert_eq!(String::from_utf8(hdr.clone()).unwrap(), expected);
        assert!(!ensure_namespaces(&mut hdr, tags::HEADER_ROOT, &[("v", VML)]).unwrap());
    }

    #[test]
    fn missing_root_is_malformed() {
        let mut buf = b"<w:document/>".to_vec();
        let err = ensure_namespaces(&mut buf, tags::HEADER_ROOT, &[("v", VML)]).unwrap_err();
        assert!(matches!(err, SpliceError::Malformed(_)));
    }
}
