//! Mirror resolver
//!
//! Drives one resolution per broken reference: parse the URL, generate
//! candidates, probe them strictly one at a time and stop at the first success.

use crate::candidate_generator::CandidateGenerator;
use crate::config::MirrorConfig;
use crate::descriptor_rewriter::rewrite_descriptor;
use crate::metrics::MirrorMetrics;
use crate::models::{CandidateList, ResolutionState};
use crate::prober::ImageProber;
use crate::reference::ImageReference;
use crate::url_parser::parse_reference;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result of resolving a single URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A candidate passed its probe; `attempts` counts probes including the winner
    Resolved { url: String, attempts: usize },
    /// Every candidate failed
    Exhausted { attempts: usize },
    /// The URL is outside the shard naming scheme; nothing was probed
    Unrecognized,
}

impl Resolution {
    /// Terminal resolution state. An unrecognised URL counts as exhausted.
    pub fn state(&self) -> ResolutionState {
        match self {
            Resolution::Resolved { url, .. } => ResolutionState::Resolved(url.clone()),
            Resolution::Exhausted { .. } | Resolution::Unrecognized => ResolutionState::Exhausted,
        }
    }

    pub fn resolved_url(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn attempts(&self) -> usize {
        match self {
            Resolution::Resolved { attempts, .. } | Resolution::Exhausted { attempts } => *attempts,
            Resolution::Unrecognized => 0,
        }
    }
}

/// What happened to an [`ImageReference`] handed to [`MirrorResolver::fix`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// The reference was already in progress or done; nothing was probed
    Skipped,
    /// The current URL is outside the shard naming scheme
    Unrecognized,
    /// The reference now points at `url`; `descriptor` is the rewritten srcset, if any
    Resolved {
        url: String,
        descriptor: Option<String>,
        attempts: usize,
    },
    /// No candidate worked; the reference is unchanged
    Exhausted { attempts: usize },
    /// A mirror was found but the reference's source changed while probing
    Superseded { url: String },
}

/// Resolves broken sharded image URLs to working mirrors
#[derive(Clone)]
pub struct MirrorResolver {
    config: Arc<MirrorConfig>,
    generator: Arc<CandidateGenerator>,
    prober: Arc<dyn ImageProber>,
    metrics: Arc<MirrorMetrics>,
}

impl MirrorResolver {
    /// Create a new MirrorResolver with its own metrics collector
    pub fn new(config: Arc<MirrorConfig>, prober: Arc<dyn ImageProber>) -> Self {
        Self::with_metrics(config, prober, Arc::new(MirrorMetrics::new()))
    }

    /// Create a new MirrorResolver that records into a shared metrics collector
    pub fn with_metrics(
        config: Arc<MirrorConfig>,
        prober: Arc<dyn ImageProber>,
        metrics: Arc<MirrorMetrics>,
    ) -> Self {
        MirrorResolver {
            generator: Arc::new(CandidateGenerator::new(Arc::clone(&config))),
            config,
            prober,
            metrics,
        }
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MirrorMetrics {
        &self.metrics
    }

    pub fn metrics_arc(&self) -> Arc<MirrorMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Probe `url` once, outside any resolution. Used to tell healthy images from broken ones.
    pub async fn is_reachable(&self, url: &str) -> bool {
        let started = Instant::now();
        let outcome = self.prober.probe(url).await;
        self.metrics.record_probe(&outcome, started.elapsed());
        outcome.is_ok()
    }

    /// Candidate list for `url`, or `None` if it is not a sharded URL
    pub fn candidates_for(&self, url: &str) -> Option<CandidateList> {
        parse_reference(url).map(|parsed| self.generator.generate(&parsed))
    }

    /// Find a working mirror for `url`.
    ///
    /// Candidates are probed sequentially: the next probe starts only after the
    /// previous one settled. The first success ends the resolution.
    pub async fn resolve_url(&self, url: &str) -> Resolution {
        let Some(candidates) = self.candidates_for(url) else {
            self.metrics.record_unrecognized();
            return Resolution::Unrecognized;
        };

        self.metrics.record_resolution_started();
        debug!(
            "Resolving broken reference: url={}, candidates={}",
            url,
            candidates.len()
        );

        let mut state = ResolutionState::Untried;
        let mut attempts = 0;
        for (index, candidate) in candidates.iter().enumerate() {
            state.advance(ResolutionState::Probing(index));
            attempts += 1;

            let started = Instant::now();
            let outcome = self.prober.probe(candidate).await;
            self.metrics.record_probe(&outcome, started.elapsed());

            match outcome {
                Ok(()) => {
                    state.advance(ResolutionState::Resolved(candidate.clone()));
                    break;
                }
                Err(reason) => {
                    debug!(
                        "Candidate rejected: url={}, attempt={}, reason={}",
                        candidate, attempts, reason
                    );
                }
            }
        }

        if let ResolutionState::Resolved(resolved) = &state {
            let resolved = resolved.clone();
            self.metrics.record_resolved();
            info!(
                "Resolved broken reference: url={}, mirror={}, attempts={}",
                url, resolved, attempts
            );
            return Resolution::Resolved {
                url: resolved,
                attempts,
            };
        }

        state.advance(ResolutionState::Exhausted);
        self.metrics.record_exhausted();
        warn!(
            "No working mirror found: url={}, attempts={}",
            url, attempts
        );
        Resolution::Exhausted { attempts }
    }

    /// Resolve an image reference and apply the result to it.
    ///
    /// The reference is claimed synchronously before the first `.await`, so a
    /// second call for the same reference, concurrent or later, is a no-op.
    /// On success the current URL is replaced, the descriptor is rewritten to
    /// the same shard and the marker becomes `Done`. On failure the reference
    /// keeps its source and stays `InProgress` until its source changes.
    pub async fn fix(&self, reference: &ImageReference) -> FixOutcome {
        let Some(ticket) = reference.try_begin() else {
            self.metrics.record_skipped();
            debug!(
                "Skipping reference already in progress or done: url={}",
                reference.current_url()
            );
            return FixOutcome::Skipped;
        };

        match self.resolve_url(&ticket.url).await {
            Resolution::Unrecognized => FixOutcome::Unrecognized,
            Resolution::Exhausted { attempts } => FixOutcome::Exhausted { attempts },
            Resolution::Resolved { url, attempts } => {
                let descriptor = rewrite_descriptor(ticket.descriptor.as_deref(), &url);
                if reference.commit(&ticket, url.clone(), descriptor.clone()) {
                    FixOutcome::Resolved {
                        url,
                        descriptor,
                        attempts,
                    }
                } else {
                    debug!(
                        "Reference source changed during resolution: original={}, mirror={}",
                        ticket.url, url
                    );
                    FixOutcome::Superseded { url }
                }
            }
        }
    }
}
