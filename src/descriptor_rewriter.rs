//! Rewrites responsive-image descriptors (`srcset`) to a confirmed shard

use crate::url_parser::parse_reference;
use regex::{NoExpand, Regex};
use std::sync::OnceLock;

fn shard_host_pattern() -> &'static Regex {
    static SHARD_HOST: OnceLock<Regex> = OnceLock::new();
    SHARD_HOST.get_or_init(|| {
        Regex::new(r"(?i)https?://[a-z]+[0-9]{1,3}\.[a-z0-9-]+\.(?:org|net|to)")
            .unwrap_or_else(|err| panic!("invalid shard host regex: {err}"))
    })
}

/// Point every sharded host in `descriptor` at the shard of `resolved_url`.
///
/// Each `scheme://<letters><digits>.<label>.<tld>` occurrence is replaced with
/// the resolved base (`https://n05.mbrtz.org`); paths and size hints are left
/// alone. Returns `None` when the descriptor is absent or empty, or when
/// `resolved_url` is not a sharded URL.
pub fn rewrite_descriptor(descriptor: Option<&str>, resolved_url: &str) -> Option<String> {
    let descriptor = descriptor.filter(|d| !d.is_empty())?;
    let base = parse_reference(resolved_url)?.base();

    Some(
        shard_host_pattern()
            .replace_all(descriptor, NoExpand(base.as_str()))
            .into_owned(),
    )
}
