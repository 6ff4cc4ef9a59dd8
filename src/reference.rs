//! Broken image references and their fix marker
//!
//! An [`ImageReference`] is the unit the observation layer hands to the
//! resolver: the image's current URL, its optional `srcset` descriptor and a
//! tri-state [`FixMarker`]. The marker is the only state shared between the
//! resolver and the observation layer, so every transition happens under one
//! lock and never across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Re-entrancy guard for one image reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixMarker {
    NotStarted,
    InProgress,
    Done,
}

#[derive(Debug)]
struct ReferenceState {
    current_url: String,
    descriptor: Option<String>,
    marker: FixMarker,
    /// Bumped every time the observation layer swaps the source
    generation: u64,
}

/// Claim on a reference handed out by [`ImageReference::try_begin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixTicket {
    pub url: String,
    pub descriptor: Option<String>,
    generation: u64,
}

/// An image whose source may need to be moved to a working mirror
#[derive(Debug)]
pub struct ImageReference {
    state: Mutex<ReferenceState>,
}

impl ImageReference {
    pub fn new(current_url: impl Into<String>, descriptor: Option<String>) -> Self {
        ImageReference {
            state: Mutex::new(ReferenceState {
                current_url: current_url.into(),
                descriptor,
                marker: FixMarker::NotStarted,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ReferenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_url(&self) -> String {
        self.lock().current_url.clone()
    }

    pub fn descriptor(&self) -> Option<String> {
        self.lock().descriptor.clone()
    }

    pub fn marker(&self) -> FixMarker {
        self.lock().marker
    }

    /// Claim the reference for resolution.
    ///
    /// Moves `NotStarted` to `InProgress` and returns the source to resolve.
    /// Returns `None`, changing nothing, when a resolution is already running
    /// or has finished.
    pub fn try_begin(&self) -> Option<FixTicket> {
        let mut state = self.lock();
        if state.marker != FixMarker::NotStarted {
            return None;
        }
        state.marker = FixMarker::InProgress;
        Some(FixTicket {
            url: state.current_url.clone(),
            descriptor: state.descriptor.clone(),
            generation: state.generation,
        })
    }

    /// Apply a resolved source and mark the reference done.
    ///
    /// `descriptor` replaces the stored one only when `Some`. Returns `false`
    /// without touching anything if the source was swapped since `ticket` was
    /// issued.
    pub fn commit(&self, ticket: &FixTicket, url: String, descriptor: Option<String>) -> bool {
        let mut state = self.lock();
        if state.generation != ticket.generation || state.marker != FixMarker::InProgress {
            return false;
        }
        state.current_url = url;
        if descriptor.is_some() {
            state.descriptor = descriptor;
        }
        state.marker = FixMarker::Done;
        true
    }

    /// Record a source change seen by the observation layer.
    ///
    /// A reference that is not yet `Done` takes the new source and goes back to
    /// `NotStarted` so it can be resolved again. A `Done` reference is left
    /// alone. Returns whether the change was applied.
    pub fn replace_source(&self, url: impl Into<String>, descriptor: Option<String>) -> bool {
        let mut state = self.lock();
        if state.marker == FixMarker::Done {
            return false;
        }
        state.current_url = url.into();
        state.descriptor = descriptor;
        state.marker = FixMarker::NotStarted;
        state.generation += 1;
        true
    }
}
