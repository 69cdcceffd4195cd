#![forbid(unsafe_code)]

//! Validation run trace.
//!
//! Every run lifecycle transition is recorded as a [`RunEvent`]: run start,
//! supersession, per-validator resolution, stale-completion rejection, and
//! commit. Traces make the async reconciliation observable — tests count
//! cancellation signals and pin behavior with checksums instead of poking
//! at private engine state.

use std::hash::{DefaultHasher, Hash, Hasher};

use formic_validity::RunEpoch;

// ---------------------------------------------------------------------------
// RunEvent
// ---------------------------------------------------------------------------

/// An event in the validation run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunEvent {
    /// A validation run started.
    Started { epoch: RunEpoch },

    /// A run was superseded; its cancellation flag has been signalled.
    Cancelled {
        epoch: RunEpoch,
        /// The newer run that superseded this one, or the null epoch when
        /// the control was detached.
        superseded_by: RunEpoch,
    },

    /// One validator resolved. `verdict` of `None` means "no opinion".
    Resolved {
        epoch: RunEpoch,
        validator: usize,
        verdict: Option<bool>,
        /// Whether the verdict arrived synchronously during the sweep.
        synchronous: bool,
    },

    /// A completion arrived for a superseded run and was discarded.
    StaleDiscarded {
        epoch: RunEpoch,
        /// The current epoch at the time the completion arrived.
        current: RunEpoch,
    },

    /// A validity snapshot was committed to the host.
    Committed { epoch: RunEpoch, valid: bool },
}

impl RunEvent {
    /// The epoch this event belongs to.
    #[must_use]
    pub fn epoch(&self) -> RunEpoch {
        match self {
            Self::Started { epoch }
            | Self::Cancelled { epoch, .. }
            | Self::Resolved { epoch, .. }
            | Self::StaleDiscarded { epoch, .. }
            | Self::Committed { epoch, .. } => *epoch,
        }
    }

    /// Event type name for logging and lookups.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Cancelled { .. } => "cancelled",
            Self::Resolved { .. } => "resolved",
            Self::StaleDiscarded { .. } => "stale_discarded",
            Self::Committed { .. } => "committed",
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationTrace
// ---------------------------------------------------------------------------

/// Ordered log of run events, checksummable for regression pinning.
#[derive(Debug, Clone, Default)]
pub struct ValidationTrace {
    events: Vec<RunEvent>,
}

impl ValidationTrace {
    /// Create an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event.
    pub fn push(&mut self, event: RunEvent) {
        self.events.push(event);
    }

    /// All events in order.
    #[must_use]
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Whether the trace holds an event of the given type for `epoch`.
    #[must_use]
    pub fn contains_event_type(&self, epoch: RunEpoch, event_type: &str) -> bool {
        self.events
            .iter()
            .any(|e| e.epoch() == epoch && e.event_type() == event_type)
    }

    /// All events for one epoch.
    #[must_use]
    pub fn events_for_epoch(&self, epoch: RunEpoch) -> Vec<&RunEvent> {
        self.events.iter().filter(|e| e.epoch() == epoch).collect()
    }

    /// Number of cancellation signals issued so far.
    #[must_use]
    pub fn cancellation_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RunEvent::Cancelled { .. }))
            .count()
    }

    /// Number of commits recorded so far.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, RunEvent::Committed { .. }))
            .count()
    }

    /// Checksum over all event data and ordering.
    #[must_use]
    pub fn checksum(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for event in &self.events {
            event.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the trace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
