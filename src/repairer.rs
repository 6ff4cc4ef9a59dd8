//! HTML document repair
//!
//! Finds sharded `<img>` sources in a document, resolves the broken ones to
//! working mirrors and splices the new `src`/`srcset` values back in place.

use crate::error::{MirrorError, Result};
use crate::html_scanner::{encode_attribute, scan_images, ImageSlot};
use crate::reference::ImageReference;
use crate::resolver::{FixOutcome, MirrorResolver};
use crate::url_parser::parse_reference;
use std::ops::Range;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Final state of one image after a repair pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    /// The original source answered its probe
    Healthy,
    /// Moved to a working mirror
    Resolved { url: String, attempts: usize },
    /// Broken and no candidate worked
    Exhausted { attempts: usize },
    /// Not resolved in this pass (already claimed or source changed)
    Skipped,
}

impl From<FixOutcome> for ImageStatus {
    fn from(outcome: FixOutcome) -> Self {
        match outcome {
            FixOutcome::Resolved { url, attempts, .. } => ImageStatus::Resolved { url, attempts },
            FixOutcome::Exhausted { attempts } => ImageStatus::Exhausted { attempts },
            FixOutcome::Skipped | FixOutcome::Unrecognized | FixOutcome::Superseded { .. } => {
                ImageStatus::Skipped
            }
        }
    }
}

/// Per-image entry of a [`RepairReport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    pub original_url: String,
    pub status: ImageStatus,
}

/// Repaired document and what happened to each sharded image, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub html: String,
    pub images: Vec<ImageReport>,
}

impl RepairReport {
    fn count(&self, pred: impl Fn(&ImageStatus) -> bool) -> usize {
        self.images.iter().filter(|i| pred(&i.status)).count()
    }

    pub fn healthy_count(&self) -> usize {
        self.count(|s| matches!(s, ImageStatus::Healthy))
    }

    pub fn resolved_count(&self) -> usize {
        self.count(|s| matches!(s, ImageStatus::Resolved { .. }))
    }

    pub fn exhausted_count(&self) -> usize {
        self.count(|s| matches!(s, ImageStatus::Exhausted { .. }))
    }
}

/// Repairs broken sharded images in HTML documents
pub struct DocumentRepairer {
    resolver: Arc<MirrorResolver>,
}

impl DocumentRepairer {
    pub fn new(resolver: MirrorResolver) -> Self {
        DocumentRepairer {
            resolver: Arc::new(resolver),
        }
    }

    pub fn resolver(&self) -> &MirrorResolver {
        &self.resolver
    }

    /// Repair every broken sharded image in `html`.
    ///
    /// Each image is resolved in its own task; within a task candidates are
    /// still probed one at a time. Images whose `src` is not a sharded URL are
    /// left out of the report.
    pub async fn repair(&self, html: &str) -> Result<RepairReport> {
        let slots: Vec<ImageSlot> = scan_images(html)
            .into_iter()
            .filter(|slot| parse_reference(&slot.src.value).is_some())
            .collect();
        debug!("Found sharded images: count={}", slots.len());

        let verify_original = self.resolver.config().verify_original;
        let mut tasks = JoinSet::new();
        for (index, slot) in slots.iter().enumerate() {
            let resolver = Arc::clone(&self.resolver);
            let reference = ImageReference::new(
                slot.src.value.clone(),
                slot.srcset.as_ref().map(|s| s.value.clone()),
            );

            tasks.spawn(async move {
                if verify_original && resolver.is_reachable(&reference.current_url()).await {
                    return (index, ImageStatus::Healthy, None);
                }
                let outcome = resolver.fix(&reference).await;
                let descriptor = match &outcome {
                    FixOutcome::Resolved { descriptor, .. } => descriptor.clone(),
                    _ => None,
                };
                (index, ImageStatus::from(outcome), descriptor)
            });
        }

        let mut results = vec![None; slots.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, status, descriptor) = joined
                .map_err(|e| MirrorError::InternalError(format!("Repair task failed: {}", e)))?;
            results[index] = Some((status, descriptor));
        }

        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        let mut images = Vec::with_capacity(slots.len());
        for (slot, result) in slots.iter().zip(results) {
            let (status, descriptor) = result.ok_or_else(|| {
                MirrorError::InternalError("Repair task produced no result".to_string())
            })?;

            if let ImageStatus::Resolved { url, .. } = &status {
                edits.push((slot.src.range.clone(), encode_attribute(url, slot.src.quote)));
                if let (Some(srcset), Some(descriptor)) = (&slot.srcset, descriptor) {
                    edits.push((srcset.range.clone(), encode_attribute(&descriptor, srcset.quote)));
                }
            }

            images.push(ImageReport {
                original_url: slot.src.value.clone(),
                status,
            });
        }

        let report = RepairReport {
            html: apply_edits(html, edits),
            images,
        };
        info!(
            "Repair pass finished: images={}, healthy={}, resolved={}, exhausted={}",
            report.images.len(),
            report.healthy_count(),
            report.resolved_count(),
            report.exhausted_count()
        );
        Ok(report)
    }
}

/// Replace non-overlapping byte ranges, working back to front so earlier offsets stay valid
fn apply_edits(html: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = html.to_string();
    for (range, replacement) in edits {
        out.replace_range(range, &replacement);
    }
    out
}
