//! Tracked-change markup: `<w:ins>` and `<w:del>` revisions over paragraphs.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, SpliceError};
use crate::ids::{next_id, IdNamespace};
use crate::locator::first_element;
use crate::markup::{close_tag, escape, find_from, is_blank, next_start_tag, rfind};
use crate::namespaces::tags;

/// Author, timestamp and id counter shared by the revisions of one edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionContext {
    pub author: String,
    pub date: DateTime<Utc>,
    pub next_id: u32,
}

impl RevisionContext {
    /// Seed the id counter from the revisions already present in `document`.
    pub fn for_document(document: &[u8], author: impl Into<String>, date: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            author: author.into(),
            date,
            next_id: next_id(document, IdNamespace::Revision)?,
        })
    }

    fn issue(&mut self) -> Result<u32> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| SpliceError::malformed(format!("no revision id left after {id}")))?;
        Ok(id)
    }

    fn attributes(&mut self) -> Result<String> {
        Ok(format!(
            "w:id=\"{}\" w:author=\"{}\" w:date=\"{}\"",
            self.issue()?,
            escape(&self.author),
            self.date.to_rfc3339_opts(SecondsFormat::Secs, true)
        ))
    }
}

fn paragraph_bounds(paragraph: &[u8]) -> Result<(crate::markup::StartTag, usize)> {
    let open = next_start_tag(paragraph, tags::PARAGRAPH, 0)?
        .ok_or_else(|| SpliceError::invalid("fragment is not a <w:p> paragraph"))?;
    if open.self_closing {
        return Ok((open, open.end));
    }
    let close = rfind(paragraph, &close_tag(tags::PARAGRAPH))
        .filter(|&at| at >= open.end)
        .ok_or_else(|| SpliceError::malformed("<w:p> is never closed"))?;
    Ok((open, close))
}

/// Mark a whole paragraph as inserted.
///
/// The paragraph mark gets `<w:rPr><w:ins/></w:rPr>` inside `<w:pPr>` and
/// everything after `<w:pPr>` is wrapped in one `<w:ins>`; the two use
/// consecutive ids from `ctx`.
pub fn mark_inserted(paragraph: &[u8], ctx: &mut RevisionContext) -> Result<Vec<u8>> {
    let (open, close) = paragraph_bounds(paragraph)?;
    let mark = format!("<w:ins {}/>", ctx.attributes()?);

    let mut out = Vec::with_capacity(paragraph.len() + 2 * mark.len());
    if open.self_closing {
        out.extend_from_slice(&paragraph[..open.end - 2]);
        out.push(b'>');
        out.extend_from_slice(format!("<w:pPr><w:rPr>{mark}</w:rPr></w:pPr></w:p>").as_bytes());
        return Ok(out);
    }

    out.extend_from_slice(&paragraph[..open.end]);
    let props = first_element(paragraph, tags::PARAGRAPH_PROPS, open.end)?
        .filter(|props| props.start < close && is_blank(&paragraph[open.end..props.start]));
    let content_start = match props {
        Some(props) => {
            out.extend_from_slice(&paragraph[open.end..props.start]);
            out.extend_from_slice(&paragraph_mark_with(props.slice(paragraph), &mark)?);
            props.end
        }
        None => {
            out.extend_from_slice(format!("<w:pPr><w:rPr>{mark}</w:rPr></w:pPr>").as_bytes());
            open.end
        }
    };

    let content = &paragraph[content_start..close];
    if !is_blank(content) {
        out.extend_from_slice(format!("<w:ins {}>", ctx.attributes()?).as_bytes());
        out.extend_from_slice(content);
        out.extend_from_slice(b"</w:ins>");
    } else {
        out.extend_from_slice(content);
    }
    out.extend_from_slice(&paragraph[close..]);
    Ok(out)
}

/// Add `mark` to the paragraph-mark run properties of a `<w:pPr>` element.
fn paragraph_mark_with(props: &[u8], mark: &str) -> Result<Vec<u8>> {
    let open = next_start_tag(props, tags::PARAGRAPH_PROPS, 0)?
        .ok_or_else(|| SpliceError::malformed("<w:pPr> without a start tag"))?;
    if open.self_closing {
        let mut out = props[..open.end - 2].trim_ascii_end().to_vec();
        out.extend_from_slice(format!("><w:rPr>{mark}</w:rPr></w:pPr>").as_bytes());
        return Ok(out);
    }
    let close = props.len() - close_tag(tags::PARAGRAPH_PROPS).len();
    let mut out = Vec::with_capacity(props.len() + mark.len() + 16);
    match first_element(&props[..close], tags::RUN_PROPS, open.end)? {
        Some(run_props) => {
            let rpr_open = next_start_tag(props, tags::RUN_PROPS, run_props.start)?
                .ok_or_else(|| SpliceError::malformed("<w:rPr> without a start tag"))?;
            if rpr_open.self_closing {
                out.extend_from_slice(&props[..rpr_open.end - 2]);
                out.extend_from_slice(format!(">{mark}</w:rPr>").as_bytes());
            } else {
                out.extend_from_slice(&props[..rpr_open.end]);
                out.extend_from_slice(mark.as_bytes());
                out.extend_from_slice(&props[rpr_open.end..run_props.end]);
            }
            out.extend_from_slice(&props[run_props.end..]);
        }
        None => {
            // The paragraph-mark rPr follows every other pPr child except
            // sectPr and pPrChange.
            let trailing = [tags::SECTION_PROPS, "w:pPrChange"]
                .iter()
                .map(|tag| next_start_tag(&props[..close], tag, open.end))
                .collect::<Result<Vec<_>>>()?;
            let at = trailing.into_iter().flatten().map(|tag| tag.start).min().unwrap_or(close);
            out.extend_from_slice(&props[..at]);
            out.extend_from_slice(format!("<w:rPr>{mark}</w:rPr>").as_bytes());
            out.extend_from_slice(&props[at..]);
        }
    }
    Ok(out)
}

/// Mark every text run of a paragraph as deleted.
///
/// Each run holding a `<w:t>` is wrapped in its own `<w:del>` with a fresh id
/// and its `<w:t>` elements become `<w:delText>`, keeping their attributes.
/// Runs without text (note references, field characters, drawings) are
/// left as they are.
pub fn mark_deleted(paragraph: &[u8], ctx: &mut RevisionContext) -> Result<Vec<u8>> {
    paragraph_bounds(paragraph)?;
    let close = close_tag(tags::RUN);
    let mut out = Vec::with_capacity(paragraph.len() * 2);
    let mut cursor = 0;
    while let Some(run) = next_start_tag(paragraph, tags::RUN, cursor)? {
        out.extend_from_slice(&paragraph[cursor..run.start]);
        if run.self_closing {
            out.extend_from_slice(&paragraph[run.start..run.end]);
            cursor = run.end;
            continue;
        }
        let end = find_from(paragraph, &close, run.end)
            .map(|at| at + close.len())
            .ok_or_else(|| SpliceError::malformed("<w:r> is never closed"))?;
        let run_bytes = &paragraph[run.start..end];
        if next_start_tag(run_bytes, tags::TEXT, 0)?.is_some() {
            out.extend_from_slice(format!("<w:del {}>", ctx.attributes()?).as_bytes());
            out.extend_from_slice(&deleted_text_run(run_bytes)?);
            out.extend_from_slice(b"</w:del>");
        } else {
            out.extend_from_slice(run_bytes);
        }
        cursor = end;
    }
    out.extend_from_slice(&paragraph[cursor..]);
    Ok(out)
}

/// Rewrite the `<w:t>` elements of one run as `<w:delText>`.
fn deleted_text_run(run: &[u8]) -> Result<Vec<u8>> {
    let close = close_tag(tags::TEXT);
    let mut out = Vec::with_capacity(run.len() + 32);
    let mut cursor = 0;
    while let Some(text) = next_start_tag(run, tags::TEXT, cursor)? {
        out.extend_from_slice(&run[cursor..text.start]);
        let attrs = &run[text.start + 1 + tags::TEXT.len()..text.end];
        out.extend_from_slice(b"<w:delText");
        if text.self_closing {
            out.extend_from_slice(attrs);
            cursor = text.end;
            continue;
        }
        if is_blank(&attrs[..attrs.len() - 1]) {
            out.extend_from_slice(b" xml:space=\"preserve\">");
        } else {
            out.extend_from_slice(attrs);
        }
        let end = find_from(run, &close, text.end)
            .ok_or_else(|| SpliceError::malformed("<w:t> is never closed"))?;
        out.extend_from_slice(&run[text.end..end]);
        out.extend_from_slice(b"</w:delText>");
        cursor = end + close.len();
    }
    out.extend_from_slice(&run[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ctx(next_id: u32) -> RevisionContext {
        RevisionContext {
            author: "Ada & Co".into(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            next_id,
        }
    }

    const ATTRS_1: &str = r#"w:id="1" w:author="Ada &amp; Co" w:date="2024-03-01T12:00:00Z""#;
    const ATTRS_2: &str = r#"w:id="2" w:author="Ada &amp; Co" w:date="2024-03-01T12:00:00Z""#;

    #[test]
    fn inserted_paragraph_without_properties() {
        let mut ctx = ctx(1);
        let out = mark_inserted(b"<w:p><w:r><w:t>New</w:t></w:r></w:p>", &mut ctx).unwrap();
        assert_eq!(
            std::str::from_utf8(&out).unwrap(),
            format!("<w:p><w:pPr><w:rPr><w:ins {ATTRS_1}/></w:rPr></w:pPr><w:ins {ATTRS_2}><w:r><w:t>New</w:t></w:r></w:ins></w:p>")
        );
        assert_eq!(ctx.next_id, 3);
    }

    #[test]
    fn inserted_paragraph_keeps_existing_properties() {
        let mut ctx = ctx(1);
        let p = br#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>T</w:t></w:r></w:p>"#;
        let out = String::from_utf8(mark_inserted(p, &mut ctx).unwrap()).unwrap();
        assert!(out.starts_with(&format!(
            "<w:p><w:pPr><w:pStyle w:val=\"Heading1\"/><w:rPr><w:ins {ATTRS_1}/></w:rPr></w:pPr><w:ins {ATTRS_2}>"
        )));
    }

    #[test]
    fn existing_paragraph_mark_properties_get_the_insertion_first() {
        let mut ctx = ctx(1);
        let p = br#"<w:p><w:pPr><w:rPr><w:b/></w:rPr></w:pPr></w:p>"#;
        let out = String::from_utf8(mark_inserted(p, &mut ctx).unwrap()).unwrap();
        assert_eq!(out, format!("<w:p><w:pPr><w:rPr><w:ins {ATTRS_1}/><w:b/></w:rPr></w:pPr></w:p>"));
    }

    #[test]
    fn deleted_runs_keep_attributes_and_skip_non_text_runs() {
        let mut ctx = ctx(1);
        let p = concat!(
            "<w:p><w:r><w:t>plain</w:t></w:r>",
            "<w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\"> spaced </w:t></w:r>",
            "<w:r><w:footnoteReference w:id=\"1\"/></w:r></w:p>"
        );
        let out = String::from_utf8(mark_deleted(p.as_bytes(), &mut ctx).unwrap()).unwrap();
        assert_eq!(
            out,
            format!(
                "<w:p><w:del {ATTRS_1}><w:r><w:delText xml:space=\"preserve\">plain</w:delText></w:r></w:del>\
                 <w:del {ATTRS_2}><w:r><w:rPr><w:b/></w:rPr><w:delText xml:space=\"preserve\"> spaced </w:delText></w:r></w:del>\
                 <w:r><w:footnoteReference w:id=\"1\"/></w:r></w:p>"
            )
        );
        assert_eq!(ctx.next_id, 3);
    }

    #[test]
    fn context_is_seeded_from_existing_revisions() {
        let doc = br#"<w:body><w:ins w:id="7" w:author="x"/><w:del w:id="3"/></w:body>"#;
        let ctx = RevisionContext::for_document(doc, "me", Utc::now()).unwrap();
        assert_eq!(ctx.next_id, 8);

        let doc = br#"<w:body><w:tblPrChange w:id="21" w:author="x"/><w:ins w:id="2"/></w:body>"#;
        assert_eq!(RevisionContext::for_document(doc, "me", Utc::now()).unwrap().next_id, 22);
    }

    #[test]
    fn running_out_of_ids_fails_instead_of_wrapping() {
        let mut last = ctx(u32::MAX);
        let err = mark_inserted(b"<w:p><w:r><w:t>New</w:t></w:r></w:p>", &mut last).unwrap_err();
        assert!(matches!(err, SpliceError::Malformed(_)), "{err}");

        let mut one_left = ctx(u32::MAX - 1);
        let err = mark_deleted(b"<w:p><w:r><w:t>a</w:t></w:r><w:r><w:t>b</w:t></w:r></w:p>", &mut one_left).unwrap_err();
        assert!(matches!(err, SpliceError::Malformed(_)), "{err}");
    }

    #[test]
    fn broken_section_inside_paragraph_properties_is_reported() {
        let mut ctx = ctx(1);
        let err = mark_inserted(b"<w:p><w:pPr><w:jc w:val=\"left\"/><w:sectPr</w:pPr></w:p>", &mut ctx).unwrap_err();
        assert!(matches!(err, SpliceError::Malformed(_)), "{err}");
    }

    #[test]
    fn non_paragraph_is_rejected() {
        let mut ctx = ctx(1);
        assert!(matches!(
            mark_deleted(b"<w:tbl/>", &mut ctx).unwrap_err(),
            SpliceError::InvalidArgument(_)
        ));
    }
}
