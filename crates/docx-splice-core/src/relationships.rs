//! Idempotent edits of `.rels` parts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpliceError};
use crate::ids::{next_id, IdNamespace};
use crate::markup::{attribute, escape, insert_before_close, next_start_tag, unescape};
use crate::namespaces::PACKAGE_RELATIONSHIPS;

const ROOT: &str = "Relationships";
const ENTRY: &str = "Relationship";

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_mode: Option<String>,
}

/// Result of [`ensure_relationship`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured {
    pub id: String,
    /// False when an entry with the same target already existed and the
    /// buffer was left untouched.
    pub added: bool,
}

/// Path of the `.rels` part that holds relationships for `part`.
///
/// `word/document.xml` maps to `word/_rels/document.xml.rels`; the package
/// itself (empty name) maps to `_rels/.rels`.
pub fn rels_path_for(part: &str) -> String {
    let part = part.strip_prefix('/').unwrap_or(part);
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target relative to the part that owns the `.rels`.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let source = source_part.strip_prefix('/').unwrap_or(source_part);
    let mut segments: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// A `.rels` part with no entries.
pub fn empty_relationships() -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<{ROOT} xmlns=\"{PACKAGE_RELATIONSHIPS}\"></{ROOT}>"
    )
    .into_bytes()
}

/// Every entry of a `.rels` part, in document order.
pub fn parse_relationships(rels: &[u8]) -> Result<Vec<Relationship>> {
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(tag) = next_start_tag(rels, ENTRY, cursor)? {
        let bytes = &rels[tag.start..tag.end];
        let required = |name: &str| {
            attribute(bytes, name)
                .map(|v| unescape(v).into_owned())
                .ok_or_else(|| SpliceError::malformed(format!("<Relationship> without {name}")))
        };
        out.push(Relationship {
            id: required("Id")?,
            rel_type: required("Type")?,
            target: required("Target")?,
            target_mode: attribute(bytes, "TargetMode").map(|v| unescape(v).into_owned()),
        });
        cursor = tag.end;
    }
    Ok(out)
}

/// Target of the relationship with id `id`.
pub fn relationship_target(rels: &[u8], id: &str) -> Result<Option<String>> {
    Ok(parse_relationships(rels)?
        .into_iter()
        .find(|rel| rel.id == id)
        .map(|rel| rel.target))
}

/// Id of the first relationship pointing at exactly `target`.
pub fn find_by_target(rels: &[u8], target: &str) -> Result<Option<String>> {
    Ok(parse_relationships(rels)?
        .into_iter()
        .find(|rel| rel.target == target)
        .map(|rel| rel.id))
}

/// Make sure `rels` holds a relationship to `target`.
///
/// When one exists its id is returned and `rels` is not modified. Otherwise a
/// new entry with id `rId(max+1)` is appended just before `</Relationships>`.
pub fn ensure_relationship(rels: &mut Vec<u8>, target: &str, rel_type: &str) -> Result<Ensured> {
    if let Some(id) = find_by_target(rels, target)? {
        return Ok(Ensured { id, added: false });
    }
    let id = format!("rId{}", next_id(rels, IdNamespace::Relationship)?);
    let entry = format!(
        "<{ENTRY} Id=\"{id}\" Type=\"{}\" Target=\"{}\"/>",
        escape(rel_type),
        escape(target)
    );
    insert_before_close(rels, ROOT, entry.as_bytes())?;
    Ok(Ensured { id, added: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::rel_types;
    use pretty_assertions::assert_eq;

    const RELS: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        r#"<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>"#,
        r#"</Relationships>"#
    );

    #[test]
    fn rels_paths() {
        assert_eq!(rels_path_for("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_path_for("/word/charts/chart2.xml"), "word/charts/_rels/chart2.xml.rels");
        assert_eq!(rels_path_for(""), "_rels/.rels");
    }

    #[test]
    fn targets_resolve_relative_to_source() {
        assert_eq!(resolve_target("word/document.xml", "charts/chart1.xml"), "word/charts/chart1.xml");
        assert_eq!(
            resolve_target("word/charts/chart1.xml", "../embeddings/Microsoft_Excel_Worksheet1.xlsx"),
            "word/embeddings/Microsoft_Excel_Worksheet1.xlsx"
        );
        assert_eq!(resolve_target("word/document.xml", "/word/media/a.png"), "word/media/a.png");
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut rels = RELS.as_bytes().to_vec();
        let first = ensure_relationship(&mut rels, "charts/chart1.xml", rel_types::CHART).unwrap();
        assert_eq!(first, Ensured { id: "rId5".into(), added: true });
        let snapshot = rels.clone();
        let second = ensure_relationship(&mut rels, "charts/chart1.xml", rel_types::CHART).unwrap();
        assert_eq!(second, Ensured { id: "rId5".into(), added: false });
        assert_eq!(rels, snapshot);
    }

    #[test]
    fn existing_target_is_reused() {
        let mut rels = RELS.as_bytes().to_vec();
        let ensured = ensure_relationship(&mut rels, "styles.xml", rel_types::STYLES).unwrap();
        assert_eq!(ensured, Ensured { id: "rId1".into(), added: false });
        assert_eq!(rels, RELS.as_bytes());
    }

    #[test]
    fn parse_unescapes_and_reads_target_mode() {
        let rels = parse_relationships(RELS.as_bytes()).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[1].target, "https://example.com/?a=1&b=2");
        assert_eq!(rels[1].target_mode.as_deref(), Some("External"));
        assert_eq!(
            relationship_target(RELS.as_bytes(), "rId1").unwrap().as_deref(),
            Some("styles.xml")
        );
    }

    #[test]
    fn empty_and_self_closing_roots_accept_entries() {
        let mut rels = empty_relationships();
        let ensured = ensure_relationship(&mut rels, "comments.xml", rel_types::COMMENTS).unwrap();
        assert_eq!(ensured.id, "rId1");
        assert_eq!(parse_relationships(&rels).unwrap().len(), 1);

        let mut rels = br#"<Relationships xmlns="x"/>"#.to_vec();
        ensure_relationship(&mut rels, "footnotes.xml", rel_types::FOOTNOTES).unwrap();
        assert!(rels.ends_with(b"Target=\"footnotes.xml\"/></Relationships>"));
    }

    #[test]
    fn missing_root_close_is_malformed() {
        let mut rels = b"<Relationships>".to_vec();
        let err = ensure_relationship(&mut rels, "a.xml", rel_types::HEADER).unwrap_err();
        assert!(matches!(err, SpliceError::Malformed(_)));
    }
}
