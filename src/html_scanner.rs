//! Best-effort `<img>` discovery in raw HTML.
//!
//! Regex-based rather than a full HTML parser: the repairer only needs the
//! byte spans of `src` and `srcset` values so it can splice new URLs back in
//! without reserialising the rest of the document.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// An attribute value and its byte span in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpan {
    /// Value with the common character references decoded
    pub value: String,
    /// Span of the raw value, excluding quotes
    pub range: Range<usize>,
    /// Quote character around the value, if any
    pub quote: Option<char>,
}

/// One `<img>` tag that has a `src`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub tag: Range<usize>,
    pub src: AttributeSpan,
    pub srcset: Option<AttributeSpan>,
}

fn regex(pattern: &'static str, desc: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid {desc} regex: {err}"))
}

fn img_tag() -> &'static Regex {
    static IMG_TAG: OnceLock<Regex> = OnceLock::new();
    IMG_TAG.get_or_init(|| regex(r"(?is)<img\b[^>]*>", "img tag"))
}

/// One attribute: name, then an optional double-quoted, single-quoted or bare value.
///
/// Matches are taken left to right over the tag, so a quoted value is consumed
/// whole and text such as `alt="see src=x"` never reads as a `src` attribute.
fn attribute() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| {
        regex(
            r#"(?s)\s([^\s=>"'/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+)))?"#,
            "attribute",
        )
    })
}

fn attribute_span(caps: &regex::Captures<'_>, tag_start: usize) -> Option<AttributeSpan> {
    let (group, quote) = [(2, Some('"')), (3, Some('\'')), (4, None)]
        .into_iter()
        .find_map(|(idx, quote)| caps.get(idx).map(|m| (m, quote)))?;

    Some(AttributeSpan {
        value: decode_attribute(group.as_str()),
        range: tag_start + group.start()..tag_start + group.end(),
        quote,
    })
}

/// Find every `<img>` with a `src`, in document order.
///
/// When an attribute is repeated the first occurrence wins, as in browsers.
pub fn scan_images(html: &str) -> Vec<ImageSlot> {
    img_tag()
        .find_iter(html)
        .filter_map(|tag| {
            // Skip the `<img` tag name
            let body_start = tag.start() + 4;
            let body = &html[body_start..tag.end()];

            let mut src = None;
            let mut srcset = None;
            for caps in attribute().captures_iter(body) {
                let name = &caps[1];
                if src.is_none() && name.eq_ignore_ascii_case("src") {
                    src = Some(attribute_span(&caps, body_start));
                } else if srcset.is_none() && name.eq_ignore_ascii_case("srcset") {
                    srcset = Some(attribute_span(&caps, body_start));
                }
            }

            Some(ImageSlot {
                tag: tag.range(),
                src: src.flatten()?,
                srcset: srcset.flatten(),
            })
        })
        .collect()
}

/// Decode the character references that show up in URL attributes
pub fn decode_attribute(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Escape a value for writing back inside the given quote character
pub fn encode_attribute(value: &str, quote: Option<char>) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' if quote == Some('"') => out.push_str("&quot;"),
            '\'' if quote == Some('\'') => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
