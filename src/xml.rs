//! Fragment builders for runs and paragraphs.

use docx_splice_core::markup::escape;
use serde::{Deserialize, Serialize};

/// Paragraph alignment (`w:jc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Both,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Both => "both",
        }
    }
}

/// Direct run formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Half-points, as stored in `w:sz`.
    pub font_size: Option<u32>,
    /// Hex RGB without `#`.
    pub color: Option<String>,
}

impl RunFormat {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    /// `<w:rPr>` element, or nothing when no formatting is set.
    pub fn properties(&self) -> String {
        let mut inner = String::new();
        if self.bold {
            inner.push_str("<w:b/>");
        }
        if self.italic {
            inner.push_str("<w:i/>");
        }
        if let Some(color) = &self.color {
            inner.push_str(&format!(r#"<w:color w:val="{}"/>"#, escape(color.trim_start_matches('#'))));
        }
        if let Some(size) = self.font_size {
            inner.push_str(&format!(r#"<w:sz w:val="{size}"/><w:szCs w:val="{size}"/>"#));
        }
        if self.underline {
            inner.push_str(r#"<w:u w:val="single"/>"#);
        }
        if inner.is_empty() {
            inner
        } else {
            format!("<w:rPr>{inner}</w:rPr>")
        }
    }
}

/// Run content for `text`: tabs become `<w:tab/>`, newlines `<w:br/>`.
pub fn run_content(text: &str) -> String {
    let mut out = String::new();
    let mut pending = String::new();
    let flush = |pending: &mut String, out: &mut String| {
        if !pending.is_empty() {
            out.push_str(&format!(r#"<w:t xml:space="preserve">{}</w:t>"#, escape(pending)));
            pending.clear();
        }
    };
    for c in text.chars() {
        match c {
            '\t' => {
                flush(&mut pending, &mut out);
                out.push_str("<w:tab/>");
            }
            '\n' => {
                flush(&mut pending, &mut out);
                out.push_str("<w:br/>");
            }
            '\r' => {}
            other => pending.push(other),
        }
    }
    flush(&mut pending, &mut out);
    out
}

pub fn run(text: &str, format: &RunFormat) -> String {
    format!("<w:r>{}{}</w:r>", format.properties(), run_content(text))
}

/// `<w:pPr>` with an optional style and alignment, or nothing.
pub fn paragraph_properties(style: Option<&str>, alignment: Option<Alignment>) -> String {
    let mut inner = String::new();
    if let Some(style) = style.filter(|s| !s.is_empty()) {
        inner.push_str(&format!(r#"<w:pStyle w:val="{}"/>"#, escape(style)));
    }
    if let Some(alignment) = alignment {
        inner.push_str(&format!(r#"<w:jc w:val="{}"/>"#, alignment.as_str()));
    }
    if inner.is_empty() {
        inner
    } else {
        format!("<w:pPr>{inner}</w:pPr>")
    }
}

pub fn paragraph(text: &str, style: Option<&str>, format: &RunFormat) -> String {
    let runs = if text.is_empty() { String::new() } else { run(text, format) };
    format!("<w:p>{}{runs}</w:p>", paragraph_properties(style, None))
}
