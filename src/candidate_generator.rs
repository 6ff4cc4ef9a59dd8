//! Candidate Generator
//!
//! Builds the ordered list of mirror URLs to probe for a broken reference.

use crate::config::MirrorConfig;
use crate::models::{shard_base, CandidateList, ParsedReference};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Generates mirror candidates from three mutation strategies, in this order:
///
/// 1. prefix swap: every fallback prefix other than the reference's own
/// 2. root swap: every fallback root whose label differs from the reference's
/// 3. shard sweep: shard numbers `0..=max_shard_number` other than the reference's
///
/// The output is deduplicated (first occurrence wins) and capped at
/// `max_attempts` entries. Its order is the probe priority.
pub struct CandidateGenerator {
    config: Arc<MirrorConfig>,
}

impl CandidateGenerator {
    /// Create a new CandidateGenerator with the given configuration
    pub fn new(config: Arc<MirrorConfig>) -> Self {
        CandidateGenerator { config }
    }

    /// Generate the candidate list for a parsed reference
    pub fn generate(&self, parsed: &ParsedReference) -> CandidateList {
        let mut raw = Vec::new();
        let build = |prefix: &str, shard: u16, root: &str, tld| {
            format!("{}{}", shard_base(prefix, shard, root, tld), parsed.path)
        };

        // Strategy A: swap prefix (k02 -> n02)
        for prefix in self.config.prefixes() {
            if prefix != parsed.prefix {
                raw.push(build(
                    &prefix,
                    parsed.shard_number,
                    &parsed.root_domain,
                    parsed.top_level_domain,
                ));
            }
        }

        // Strategy B: swap root domain (mbdny.org -> mbrtz.org)
        for root in self.config.roots() {
            if root.label != parsed.root_domain {
                raw.push(build(
                    &parsed.prefix,
                    parsed.shard_number,
                    &root.label,
                    root.top_level_domain,
                ));
            }
        }

        // Strategy C: sweep shard numbers (k02 -> k00..k15)
        for shard in 0..=self.config.max_shard_number {
            if shard != parsed.shard_number {
                raw.push(build(
                    &parsed.prefix,
                    shard,
                    &parsed.root_domain,
                    parsed.top_level_domain,
                ));
            }
        }

        let generated = raw.len();
        let mut seen = HashSet::with_capacity(generated);
        let urls: Vec<String> = raw
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .take(self.config.max_attempts)
            .collect();

        debug!(
            "Generated candidates: reference={}, generated={}, kept={}",
            parsed.to_url(),
            generated,
            urls.len()
        );

        CandidateList::new(urls)
    }
}
