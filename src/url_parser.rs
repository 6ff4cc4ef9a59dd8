//! Parser for sharded image URLs
//!
//! Accepted grammar (case-insensitive):
//!
//! ```text
//! url    = scheme "://" shard "." root "." tld path
//! scheme = "http" | "https"
//! shard  = 1*ALPHA 1*3DIGIT
//! root   = 1*( ALPHA | DIGIT | "-" )
//! tld    = "org" | "net" | "to"
//! path   = "" | "/" *CHAR
//! ```
//!
//! The host ends at the first `/`. Anything else left in it (a port, userinfo,
//! a query without a leading slash, another label) fails the match.

use crate::models::{ParsedReference, TopLevelDomain};
use tracing::debug;

const SCHEMES: [&str; 2] = ["https://", "http://"];
const MAX_SHARD_DIGITS: usize = 3;

/// Parse a sharded image URL into its fields.
///
/// Returns `None` for anything outside the grammar; there are no partial matches.
pub fn parse_reference(url: &str) -> Option<ParsedReference> {
    let parsed = parse_fields(url);
    if parsed.is_none() {
        debug!("URL does not match shard naming scheme: url={}", url);
    }
    parsed
}

fn parse_fields(url: &str) -> Option<ParsedReference> {
    let rest = strip_scheme(url)?;

    let (host, path) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    let mut labels = host.split('.');
    let shard_label = labels.next()?;
    let root = labels.next()?;
    let tld = labels.next()?;
    if labels.next().is_some() {
        return None;
    }

    let (prefix, shard_number) = split_shard_label(shard_label)?;
    if !is_root_label(root) {
        return None;
    }
    let top_level_domain: TopLevelDomain = tld.parse().ok()?;

    Some(ParsedReference {
        prefix: prefix.to_ascii_lowercase(),
        shard_number,
        root_domain: root.to_ascii_lowercase(),
        top_level_domain,
        path: path.to_string(),
    })
}

fn strip_scheme(url: &str) -> Option<&str> {
    SCHEMES.iter().find_map(|scheme| {
        let head = url.get(..scheme.len())?;
        if head.eq_ignore_ascii_case(scheme) {
            url.get(scheme.len()..)
        } else {
            None
        }
    })
}

/// Split `k02` into (`k`, 2). Letters first, then 1 to 3 digits, nothing else.
fn split_shard_label(label: &str) -> Option<(&str, u16)> {
    let letters = label
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();
    if letters == 0 {
        return None;
    }

    let (prefix, digits) = label.split_at(letters);
    if digits.is_empty()
        || digits.len() > MAX_SHARD_DIGITS
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    Some((prefix, digits.parse().ok()?))
}

/// A root label is one or more ASCII letters, digits or hyphens
pub fn is_root_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
