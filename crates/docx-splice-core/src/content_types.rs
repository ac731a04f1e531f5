//! `[Content_Types].xml` registry.

use crate::error::Result;
use crate::markup::{attribute, escape, insert_before_close, next_start_tag, unescape};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const ROOT: &str = "Types";

fn has_entry(content_types: &[u8], tag: &str, key: &str, matches: impl Fn(&str) -> bool) -> Result<bool> {
    let mut cursor = 0;
    while let Some(found) = next_start_tag(content_types, tag, cursor)? {
        if let Some(value) = attribute(&content_types[found.start..found.end], key) {
            if matches(&unescape(value)) {
                return Ok(true);
            }
        }
        cursor = found.end;
    }
    Ok(false)
}

fn absolute(part_name: &str) -> String {
    if part_name.starts_with('/') {
        part_name.to_string()
    } else {
        format!("/{part_name}")
    }
}

/// Add `<Override PartName=.. ContentType=..>` unless one for `part_name`
/// exists. Returns whether the buffer changed.
pub fn ensure_override(content_types: &mut Vec<u8>, part_name: &str, content_type: &str) -> Result<bool> {
    let part_name = absolute(part_name);
    // Part names are compared case-insensitively by package consumers.
    if has_entry(content_types, "Override", "PartName", |v| v.eq_ignore_ascii_case(&part_name))? {
        return Ok(false);
    }
    let entry = format!(
        "<Override PartName=\"{}\" ContentType=\"{}\"/>",
        escape(&part_name),
        escape(content_type)
    );
    insert_before_close(content_types, ROOT, entry.as_bytes())?;
    Ok(true)
}

/// Add `<Default Extension=.. ContentType=..>` unless one for `extension`
/// exists. Returns whether the buffer changed.
pub fn ensure_default(content_types: &mut Vec<u8>, extension: &str, content_type: &str) -> Result<bool> {
    let extension = extension.trim_start_matches('.');
    if has_entry(content_types, "Default", "Extension", |v| v.eq_ignore_ascii_case(extension))? {
        return Ok(false);
    }
    let entry = format!(
        "<Default Extension=\"{}\" ContentType=\"{}\"/>",
        escape(extension),
        escape(content_type)
    );
    insert_before_close(content_types, ROOT, entry.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpliceError;
    use crate::namespaces::content_types as ct;
    use pretty_assertions::assert_eq;

    const TYPES: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"</Types>"#
    );

    #[test]
    fn override_is_added_once() {
        let mut types = TYPES.as_bytes().to_vec();
        assert!(ensure_override(&mut types, "word/charts/chart1.xml", ct::CHART).unwrap());
        let snapshot = types.clone();
        assert!(!ensure_override(&mut types, "/word/charts/chart1.xml", ct::CHART).unwrap());
        assert_eq!(types, snapshot);
        assert!(String::from_utf8(types).unwrap().contains(r#"<Override PartName="/word/charts/chart1.xml""#));
    }

    #[test]
    fn similar_part_names_are_distinct() {
        let mut types = TYPES.as_bytes().to_vec();
        ensure_override(&mut types, "word/charts/chart11.xml", ct::CHART).unwrap();
        assert!(ensure_override(&mut types, "word/charts/chart1.xml", ct::CHART).unwrap());
    }

    #[test]
    fn default_is_added_once() {
        let mut types = TYPES.as_bytes().to_vec();
        assert!(!ensure_default(&mut types, "xml", ct::XML).unwrap());
        assert!(ensure_default(&mut types, "xlsx", ct::XLSX).unwrap());
        assert!(!ensure_default(&mut types, ".xlsx", ct::XLSX).unwrap());
        assert_eq!(String::from_utf8(types).unwrap().matches(r#"Extension="xlsx""#).count(), 1);
    }

    #[test]
    fn missing_types_close_is_malformed() {
        let mut types = b"<Types>".to_vec();
        let err = ensure_override(&mut types, "word/comments.xml", ct::COMMENTS).unwrap_err();
        assert!(matches!(err, SpliceError::Malformed(_)));
    }
}
