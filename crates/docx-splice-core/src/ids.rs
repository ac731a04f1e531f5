//! Id allocation by rescanning content.
//!
//! Nothing is cached: every call scans the buffer it is given and returns
//! one more than the largest id present. The caller decides which buffer is
//! the right scope for a namespace: the `.rels` part for relationships, the
//! document body for drawings and revisions, the notes or comments part for
//! their own ids.

use std::sync::LazyLock;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpliceError};

static RELATIONSHIP_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bId\s*=\s*["']rId(\d+)["']"#).expect("static id pattern is valid"));
static DRAWING_OBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<wp:docPr\b[^>]*?\bid\s*=\s*["'](\d+)["']"#).expect("static id pattern is valid"));
static REVISION_ID: LazyLock<Regex> = LazyLock::new(|| {
    // Every tracked-change element shares one document-wide id space.
    Regex::new(concat!(
        r#"<w:(?:ins|del|moveFrom|moveTo|(?:moveFrom|moveTo)Range(?:Start|End)"#,
        r#"|customXml(?:Ins|Del|MoveFrom|MoveTo)Range(?:Start|End)"#,
        r#"|(?:rPr|pPr|sectPr|tblPr|tblPrEx|trPr|tcPr|tblGrid|numbering)Change|cell(?:Ins|Del|Merge))"#,
        r#"\b[^>]*?\bw:id\s*=\s*["'](\d+)["']"#
    ))
    .expect("static id pattern is valid")
});
static COMMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<w:comment\b[^>]*?\bw:id\s*=\s*["'](\d+)["']"#).expect("static id pattern is valid"));
static FOOTNOTE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<w:footnote\b[^>]*?\bw:id\s*=\s*["'](-?\d+)["']"#).expect("static id pattern is valid"));
static ENDNOTE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<w:endnote\b[^>]*?\bw:id\s*=\s*["'](-?\d+)["']"#).expect("static id pattern is valid"));

/// An id space whose members must be unique within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdNamespace {
    Relationship,
    DrawingObject,
    Revision,
    Comment,
    Footnote,
    Endnote,
}

impl IdNamespace {
    fn pattern(self) -> &'static Regex {
        match self {
            Self::Relationship => &RELATIONSHIP_ID,
            Self::DrawingObject => &DRAWING_OBJECT_ID,
            Self::Revision => &REVISION_ID,
            Self::Comment => &COMMENT_ID,
            Self::Footnote => &FOOTNOTE_ID,
            Self::Endnote => &ENDNOTE_ID,
        }
    }
}

/// Every id of `namespace` present in `buf`. Negative ids (note separators)
/// and values that do not fit a `u32` are skipped.
pub fn ids_in(buf: &[u8], namespace: IdNamespace) -> impl Iterator<Item = u32> + '_ {
    namespace
        .pattern()
        .captures_iter(buf)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok())
        .filter_map(|digits| digits.parse::<u32>().ok())
}

/// Largest id of `namespace` in `buf` plus one, or 1 when there is none.
///
/// Fails when the largest id is already `u32::MAX`, since any other choice
/// would reuse an id.
pub fn next_id(buf: &[u8], namespace: IdNamespace) -> Result<u32> {
    match ids_in(buf, namespace).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| SpliceError::malformed(format!("no {namespace:?} id left after {max}"))),
    }
}

/// A family of numbered parts such as `word/charts/chart1.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSeries {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl PartSeries {
    pub const CHART: PartSeries = PartSeries {
        prefix: "word/charts/chart",
        suffix: ".xml",
    };
    pub const HEADER: PartSeries = PartSeries {
        prefix: "word/header",
        suffix: ".xml",
    };
    pub const EMBEDDED_WORKBOOK: PartSeries = PartSeries {
        prefix: "word/embeddings/Microsoft_Excel_Worksheet",
        suffix: ".xlsx",
    };

    pub fn path(&self, index: u32) -> String {
        format!("{}{index}{}", self.prefix, self.suffix)
    }

    /// Index of `name` in this series, if it is a member.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        let name = name.strip_prefix('/').unwrap_or(name);
        let digits = name.strip_prefix(self.prefix)?.strip_suffix(self.suffix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

/// Next free index in `series` given the package's current part names.
pub fn next_part_index<'a>(names: impl IntoIterator<Item = &'a str>, series: PartSeries) -> u32 {
    names
        .into_iter()
        .filter_map(|name| series.index_of(name))
        .max()
        .map_or(1, |max| max.saturating_add(1))
}
