//! Custom paragraph and character styles in `word/styles.xml`.

use docx_splice_core::markup::{attribute, escape, insert_before_close, next_start_tag};
use docx_splice_core::namespaces::{content_types as ct, rel_types, WORDML};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::editor::DocxEditor;
use crate::error::{DocxError, PartContext, Result};
use crate::features::{ensure_linked_part, require_text, LinkedPart, XML_DECLARATION};
use crate::xml::Alignment;

pub const STYLES_PART: &str = "word/styles.xml";

const STYLES: LinkedPart<'static> = LinkedPart {
    path: STYLES_PART,
    rel_type: rel_types::STYLES,
    content_type: ct::STYLES,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleType {
    #[default]
    Paragraph,
    Character,
}

impl StyleType {
    fn as_str(self) -> &'static str {
        match self {
            StyleType::Paragraph => "paragraph",
            StyleType::Character => "character",
        }
    }
}

/// A style to add. Paragraph-level settings are ignored for character
/// styles. Lengths are in twips, font size in half-points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefinition {
    pub id: String,
    /// Display name; defaults to the id.
    pub name: Option<String>,
    pub kind: StyleType,
    pub based_on: Option<String>,
    pub next: Option<String>,

    pub font: Option<String>,
    pub font_size: Option<u32>,
    pub color: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub all_caps: bool,
    pub small_caps: bool,

    pub alignment: Option<Alignment>,
    pub space_before: Option<u32>,
    pub space_after: Option<u32>,
    /// 240ths of a line: 240 is single spacing.
    pub line_spacing: Option<u32>,
    pub indent_left: Option<u32>,
    pub indent_right: Option<u32>,
    pub indent_first_line: Option<i32>,
    pub keep_next: bool,
    pub keep_lines: bool,
    pub page_break_before: bool,
    /// Outline level 1-9.
    pub outline_level: Option<u8>,
}

impl StyleDefinition {
    pub fn paragraph(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    fn paragraph_properties(&self) -> String {
        let mut inner = String::new();
        if self.keep_next {
            inner.push_str("<w:keepNext/>");
        }
        if self.keep_lines {
            inner.push_str("<w:keepLines/>");
        }
        if self.page_break_before {
            inner.push_str("<w:pageBreakBefore/>");
        }
        if self.space_before.is_some() || self.space_after.is_some() || self.line_spacing.is_some() {
            inner.push_str("<w:spacing");
            if let Some(before) = self.space_before {
                inner.push_str(&format!(r#" w:before="{before}""#));
            }
            if let Some(after) = self.space_after {
                inner.push_str(&format!(r#" w:after="{after}""#));
            }
            if let Some(line) = self.line_spacing {
                inner.push_str(&format!(r#" w:line="{line}" w:lineRule="auto""#));
            }
            inner.push_str("/>");
        }
        if self.indent_left.is_some() || self.indent_right.is_some() || self.indent_first_line.is_some() {
            inner.push_str("<w:ind");
            if let Some(left) = self.indent_left {
                inner.push_str(&format!(r#" w:left="{left}""#));
            }
            if let Some(right) = self.indent_right {
                inner.push_str(&format!(r#" w:right="{right}""#));
            }
            match self.indent_first_line {
                Some(first) if first < 0 => inner.push_str(&format!(r#" w:hanging="{}""#, first.unsigned_abs())),
                Some(first) => inner.push_str(&format!(r#" w:firstLine="{first}""#)),
                None => {}
            }
            inner.push_str("/>");
        }
        if let Some(alignment) = self.alignment {
            inner.push_str(&format!(r#"<w:jc w:val="{}"/>"#, alignment.as_str()));
        }
        if let Some(level) = self.outline_level {
            inner.push_str(&format!(r#"<w:outlineLvl w:val="{}"/>"#, level - 1));
        }
        if inner.is_empty() {
            inner
        } else {
            format!("<w:pPr>{inner}</w:pPr>")
        }
    }

    fn run_properties(&self) -> String {
        let mut inner = String::new();
        if let Some(font) = self.font.as_deref().filter(|f| !f.is_empty()) {
            let font = escape(font);
            inner.push_str(&format!(r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#));
        }
        if self.bold {
            inner.push_str("<w:b/>");
        }
        if self.italic {
            inner.push_str("<w:i/>");
        }
        if self.all_caps {
            inner.push_str("<w:caps/>");
        }
        if self.small_caps {
            inner.push_str("<w:smallCaps/>");
        }
        if self.strike {
            inner.push_str("<w:strike/>");
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

    fn validate(&self) -> Result<()> {
        require_text("style id", &self.id)?;
        if self.id.chars().any(char::is_whitespace) {
            return Err(DocxError::invalid(format!("style id {:?} contains whitespace", self.id)));
        }
        if matches!(self.outline_level, Some(level) if !(1..=9).contains(&level)) {
            return Err(DocxError::invalid("outline level must be between 1 and 9"));
        }
        Ok(())
    }

    fn to_xml(&self) -> String {
        let name = self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.id);
        let mut xml = format!(
            r#"<w:style w:type="{}" w:customStyle="1" w:styleId="{}"><w:name w:val="{}"/>"#,
            self.kind.as_str(),
            escape(&self.id),
            escape(name)
        );
        if let Some(based_on) = self.based_on.as_deref().filter(|s| !s.is_empty()) {
            xml.push_str(&format!(r#"<w:basedOn w:val="{}"/>"#, escape(based_on)));
        }
        if let Some(next) = self.next.as_deref().filter(|s| !s.is_empty()) {
            xml.push_str(&format!(r#"<w:next w:val="{}"/>"#, escape(next)));
        }
        xml.push_str(r#"<w:qFormat/>"#);
        if self.kind == StyleType::Paragraph {
            xml.push_str(&self.paragraph_properties());
        }
        xml.push_str(&self.run_properties());
        xml.push_str("</w:style>");
        xml
    }
}

fn empty_styles_part() -> Vec<u8> {
    format!(r#"{XML_DECLARATION}<w:styles xmlns:w="{WORDML}"></w:styles>"#).into_bytes()
}

/// Every `w:styleId` declared in a styles part.
fn style_ids_in(styles: &[u8]) -> docx_splice_core::Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut cursor = 0;
    while let Some(tag) = next_start_tag(styles, "w:style", cursor)? {
        if let Some(id) = attribute(&styles[tag.start..tag.end], "w:styleId") {
            ids.push(id.to_string());
        }
        cursor = tag.end;
    }
    Ok(ids)
}

impl DocxEditor {
    /// Append a style definition, creating the styles part when the package
    /// has none. Adding an id that already exists is an error.
    #[instrument(level = "debug", skip(self, style), fields(id = %style.id))]
    pub fn add_style(&mut self, style: StyleDefinition) -> Result<()> {
        style.validate()?;
        let entry = style.to_xml();
        self.edit(|tx| {
            ensure_linked_part(tx, STYLES, empty_styles_part)?;
            let mut styles = tx.require(STYLES_PART)?.to_vec();
            if style_ids_in(&styles).in_part(STYLES_PART)?.contains(&style.id) {
                return Err(DocxError::invalid(format!("style {:?} already exists", style.id)));
            }
            insert_before_close(&mut styles, "w:styles", entry.as_bytes()).in_part(STYLES_PART)?;
            tx.put(STYLES_PART, styles);
            Ok(())
        })?;
        info!("Added {} style {}", style.kind.as_str(), style.id);
        Ok(())
    }

    /// Ids of all styles in the package.
    pub fn style_ids(&self) -> Result<Vec<String>> {
        match self.parts().part(STYLES_PART) {
            Some(styles) => style_ids_in(styles).in_part(STYLES_PART),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_splice_core::markup::contains;
    use pretty_assertions::assert_eq;

    fn callout() -> StyleDefinition {
        StyleDefinition {
            name: Some("Call Out".into()),
            based_on: Some("Normal".into()),
            font: Some("Georgia".into()),
            font_size: Some(28),
            bold: true,
            alignment: Some(Alignment::Center),
            space_after: Some(120),
            indent_first_line: Some(-360),
            outline_level: Some(2),
            ..StyleDefinition::paragraph("CallOut")
        }
    }

    #[test]
    fn properties_follow_schema_order() {
        let xml = callout().to_xml();
        assert!(xml.contains(concat!(
            r#"<w:pPr><w:spacing w:after="120"/><w:ind w:hanging="360"/>"#,
            r#"<w:jc w:val="center"/><w:outlineLvl w:val="1"/></w:pPr>"#
        )));
        assert!(xml.contains(r#"<w:rPr><w:rFonts w:ascii="Georgia" w:hAnsi="Georgia" w:cs="Georgia"/><w:b/><w:sz w:val="28"/>"#));
        roxmltree::Document::parse(&format!(r#"<w:styles xmlns:w="{WORDML}">{xml}</w:styles>"#)).unwrap();
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut editor = DocxEditor::new_blank().unwrap();
        editor.add_style(callout()).unwrap();
        assert!(editor.style_ids().unwrap().contains(&"CallOut".to_string()));
        let err = editor.add_style(callout()).unwrap_err();
        assert!(matches!(err, DocxError::InvalidOption(_)));
    }

    #[test]
    fn missing_styles_part_is_created() {
        let blank = DocxEditor::new_blank().unwrap();
        let mut parts: std::collections::BTreeMap<String, Vec<u8>> = blank
            .parts()
            .parts()
            .map(|(name, bytes)| (name.to_string(), bytes.to_vec()))
            .collect();
        parts.remove(STYLES_PART);
        let styles_override = regex::bytes::Regex::new(r#"<Override[^>]*PartName="/word/styles\.xml"[^>]*/>"#).unwrap();
        if let Some(types) = parts.get_mut("[Content_Types].xml") {
            *types = styles_override.replace_all(types, &b""[..]).into_owned();
        }
        let store = docx_splice_core::PartStore::from_parts(parts);
        let mut editor = DocxEditor::from_bytes(&crate::package::package_bytes(&store).unwrap()).unwrap();

        editor
            .add_style(StyleDefinition {
                kind: StyleType::Character,
                italic: true,
                alignment: Some(Alignment::Right),
                ..StyleDefinition::paragraph("Aside")
            })
            .unwrap();
        let styles = editor.parts().part(STYLES_PART).unwrap();
        assert!(contains(styles, br#"<w:style w:type="character" w:customStyle="1" w:styleId="Aside">"#));
        assert!(!contains(styles, b"<w:jc"));
        assert!(contains(editor.parts().part("[Content_Types].xml").unwrap(), b"/word/styles.xml"));
        assert_eq!(editor.style_ids().unwrap(), ["Aside"]);
    }
}
