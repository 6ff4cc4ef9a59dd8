//! Shard Mirror
//!
//! Repairs broken image references served from sharded CDN hosts such as
//! `k02.mbdny.org` by finding a reachable sibling shard and pointing the image
//! at it.
//!
//! # Overview
//!
//! Image hosts following the `<prefix><shard>.<root>.<tld>` convention serve the
//! same content from many shards, any of which may be offline. Given a broken
//! image URL, this crate builds a prioritised list of sibling URLs, probes them
//! one at a time and commits the first one that serves a real image.
//!
//! # Features
//!
//! - **Grammar-based URL parsing**: extracts prefix, shard number, root domain,
//!   TLD and path without regex guesswork
//! - **Three mutation strategies**: prefix swap, root-domain swap and shard sweep,
//!   deduplicated and capped
//! - **Sequential probing**: at most one outstanding request per broken image,
//!   with a hard per-probe timeout and no `Referer` header
//! - **srcset rewriting**: responsive-image descriptors follow the resolved shard
//! - **Re-entrancy guard**: a reference is only ever resolved once
//! - **HTML repair**: batch-fix every broken sharded `<img>` in a document
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use shard_mirror::{HttpImageProber, ImageReference, MirrorConfig, MirrorResolver};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(MirrorConfig::default());
//! let prober = Arc::new(HttpImageProber::new(&config)?);
//! let resolver = MirrorResolver::new(config, prober);
//!
//! let image = ImageReference::new("https://k02.mbdny.org/path/img.jpg", None);
//! let outcome = resolver.fix(&image).await;
//! println!("{:?} -> {}", outcome, image.current_url());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`parse_reference`]: URL pattern parser
//! - [`CandidateGenerator`]: builds the ordered candidate list
//! - [`ImageProber`] / [`HttpImageProber`]: reachability checks with timeout
//! - [`MirrorResolver`]: sequential, first-success-wins resolution
//! - [`rewrite_descriptor`]: srcset rewriting
//! - [`ImageReference`]: a broken image and its [`FixMarker`]
//! - [`DocumentRepairer`]: applies all of the above to an HTML document
//! - [`MirrorMetrics`]: probe and resolution counters
//!
//! # Configuration
//!
//! Configuration is loaded from a YAML file; every field is optional:
//!
//! ```yaml
//! fallback_prefixes: [n, x, t, s, w, m, c, u, k]
//! fallback_roots: [mbdny.org, mbrtz.org, bato.to, mbwbm.org, mbznp.org, mbqgu.org]
//! max_attempts: 30
//! max_shard_number: 15
//! probe_timeout_ms: 5000
//! min_image_width: 10
//! ```
//!
//! See [`MirrorConfig`] for all options.

pub mod config;
pub mod models;
pub mod error;
pub mod url_parser;
pub mod candidate_generator;
pub mod prober;
pub mod descriptor_rewriter;
pub mod reference;
pub mod resolver;
pub mod html_scanner;
pub mod repairer;
pub mod metrics;

// Re-export commonly used types
pub use config::MirrorConfig;
pub use models::{CandidateList, FallbackRoot, ParsedReference, ResolutionState, TopLevelDomain};
pub use error::{MirrorError, ProbeFailure, Result};
pub use url_parser::parse_reference;
pub use candidate_generator::CandidateGenerator;
pub use prober::{HttpImageProber, ImageProber, ProbeResult, WidthSniffer};
pub use descriptor_rewriter::rewrite_descriptor;
pub use reference::{FixMarker, FixTicket, ImageReference};
pub use resolver::{FixOutcome, MirrorResolver, Resolution};
pub use html_scanner::{scan_images, AttributeSpan, ImageSlot};
pub use repairer::{DocumentRepairer, ImageReport, ImageStatus, RepairReport};
pub use metrics::{MetricsSnapshot, MirrorMetrics};
