//! Byte-level helpers shared by the locator, resolver and registries.
//!
//! Nothing here parses XML into a tree. Every helper works on raw part bytes so
//! regions that are not edited survive byte-for-byte.

use std::borrow::Cow;

use memchr::memmem;

use crate::error::{Result, SpliceError};

pub fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    memmem::find(haystack, needle)
}

pub fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    memmem::find(&haystack[from..], needle).map(|i| i + from)
}

pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    memmem::rfind(haystack, needle)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memmem::find(haystack, needle).is_some()
}

/// A start tag located in a buffer: `buf[start..end]` is `<tag ...>` or `<tag .../>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTag {
    pub start: usize,
    pub end: usize,
    pub self_closing: bool,
}

/// Byte that may legally follow an element name inside a start tag.
fn ends_name(b: u8) -> bool {
    b == b'>' || b == b'/' || b.is_ascii_whitespace()
}

/// Find the next start tag for exactly `tag` at or after `from`.
///
/// `<w:t>` does not match `<w:tbl>` or `<w:tab/>`: the byte following the name
/// must close the tag, start attributes or self-close it.
pub fn next_start_tag(buf: &[u8], tag: &str, from: usize) -> Result<Option<StartTag>> {
    let mut open = Vec::with_capacity(tag.len() + 1);
    open.push(b'<');
    open.extend_from_slice(tag.as_bytes());

    let mut cursor = from;
    while let Some(pos) = find_from(buf, &open, cursor) {
        let after = pos + open.len();
        match buf.get(after) {
            Some(&b) if ends_name(b) => {
                let close = find_from(buf, b">", after)
                    .ok_or_else(|| SpliceError::malformed(format!("unterminated <{tag}> start tag")))?;
                let self_closing = close > pos && buf[close - 1] == b'/';
                return Ok(Some(StartTag {
                    start: pos,
                    end: close + 1,
                    self_closing,
                }));
            }
            Some(_) => cursor = pos + 1,
            None => {
                return Err(SpliceError::malformed(format!(
                    "buffer ends inside <{tag} start tag"
                )))
            }
        }
    }
    Ok(None)
}

/// Closing tag bytes for `tag`.
pub fn close_tag(tag: &str) -> Vec<u8> {
    let mut close = Vec::with_capacity(tag.len() + 3);
    close.extend_from_slice(b"</");
    close.extend_from_slice(tag.as_bytes());
    close.push(b'>');
    close
}

/// Value of attribute `name` inside a single start tag.
pub fn attribute<'a>(start_tag: &'a [u8], name: &str) -> Option<&'a str> {
    let key = name.as_bytes();
    let mut cursor = 0;
    while let Some(pos) = find_from(start_tag, key, cursor) {
        cursor = pos + 1;
        let preceded = pos > 0 && start_tag[pos - 1].is_ascii_whitespace();
        if !preceded {
            continue;
        }
        let mut i = pos + key.len();
        while start_tag.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        if start_tag.get(i) != Some(&b'=') {
            continue;
        }
        i += 1;
        while start_tag.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        let quote = match start_tag.get(i) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => continue,
        };
        let value_start = i + 1;
        let value_end = start_tag[value_start..]
            .iter()
            .position(|&b| b == quote)
            .map(|p| value_start + p)?;
        return std::str::from_utf8(&start_tag[value_start..value_end]).ok();
    }
    None
}

/// Splice `replacement` over `buf[start..end]`, returning a new buffer.
pub fn splice(buf: &[u8], start: usize, end: usize, replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len() - (end - start) + replacement.len());
    out.extend_from_slice(&buf[..start]);
    out.extend_from_slice(replacement);
    out.extend_from_slice(&buf[end..]);
    out
}

/// Insert `entry` right before the closing tag of `root`, expanding a
/// self-closing root when needed.
pub fn insert_before_close(buf: &mut Vec<u8>, root: &str, entry: &[u8]) -> Result<()> {
    if let Some(at) = rfind(buf, &close_tag(root)) {
        buf.splice(at..at, entry.iter().copied());
        return Ok(());
    }
    match next_start_tag(buf, root, 0)? {
        Some(tag) if tag.self_closing => {
            // `<Root .../>` becomes `<Root ...>entry</Root>`.
            let mut expanded = buf[tag.start..tag.end - 2].to_vec();
            expanded.push(b'>');
            expanded.extend_from_slice(entry);
            expanded.extend_from_slice(&close_tag(root));
            buf.splice(tag.start..tag.end, expanded);
            Ok(())
        }
        _ => Err(SpliceError::malformed(format!("missing </{root}>"))),
    }
}

pub fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

/// Escape text for use in element content or attribute values.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Resolve the predefined entities and numeric character references.
/// Unknown references are kept verbatim.
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            rest = "";
            break;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
