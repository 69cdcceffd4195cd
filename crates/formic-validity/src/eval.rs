#![forbid(unsafe_code)]

//! Verdicts, run epochs, and asynchronous completion plumbing.
//!
//! Every validation run is identified by a monotonically increasing
//! [`RunEpoch`]. Asynchronous validators receive an epoch-bound
//! [`AsyncCompleter`] and deliver their verdict through a channel the runner
//! drains on the host loop; a completer whose epoch has been superseded can
//! still send, but the runner rejects the completion before it touches any
//! state. Cancellation is cooperative: superseding a run flips a shared
//! flag that well-behaved validators observe to abandon work and release
//! their own resources.
//!
//! # Invariants
//!
//! - Epochs are strictly monotonic; epoch 0 is reserved for "no run".
//! - A completer delivers at most one completion.
//! - Completions for a superseded epoch must have no observable effect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

// ---------------------------------------------------------------------------
// RunEpoch
// ---------------------------------------------------------------------------

/// Identifier of one validation run.
///
/// Superseding a run issues a new, strictly greater epoch; results carrying
/// an older epoch are stale and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunEpoch(u64);

impl RunEpoch {
    /// The null epoch representing "no run yet".
    pub const NONE: Self = Self(0);

    /// Build an epoch from a raw value (tests, trace replay).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Raw epoch value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the null epoch.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The next epoch.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Default for RunEpoch {
    fn default() -> Self {
        Self::NONE
    }
}

impl std::fmt::Display for RunEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Epoch({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// Outcome of invoking a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The condition this validator governs is satisfied.
    Valid,
    /// The condition this validator governs is violated.
    Invalid,
    /// The validator will deliver its verdict later through the
    /// [`AsyncCompleter`] it took from the [`EvalContext`].
    Pending,
}

impl Verdict {
    /// Synchronous verdict from a boolean, `true` meaning valid.
    #[must_use]
    pub const fn from_bool(valid: bool) -> Self {
        if valid { Self::Valid } else { Self::Invalid }
    }
}

// ---------------------------------------------------------------------------
// AsyncCompletion
// ---------------------------------------------------------------------------

/// A deferred verdict delivered back to the runner.
///
/// `verdict` of `None` means "no opinion — leave the prior state for this
/// validator's condition".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncCompletion {
    /// Epoch of the run the verdict was computed for.
    pub epoch: RunEpoch,
    /// Index of the validator within its registered set.
    pub validator: usize,
    /// `Some(true)` valid, `Some(false)` invalid, `None` no opinion.
    pub verdict: Option<bool>,
}

// ---------------------------------------------------------------------------
// EvalContext / AsyncCompleter
// ---------------------------------------------------------------------------

/// Per-invocation context handed to a validator.
///
/// Synchronous validators ignore it. Asynchronous validators call
/// [`completer`](Self::completer) before returning [`Verdict::Pending`] and
/// hand the completer to whatever finishes the work.
#[derive(Debug)]
pub struct EvalContext {
    epoch: RunEpoch,
    validator: usize,
    cancelled: Arc<AtomicBool>,
    tx: Sender<AsyncCompletion>,
}

impl EvalContext {
    /// Build a context for one validator invocation.
    #[must_use]
    pub fn new(
        epoch: RunEpoch,
        validator: usize,
        cancelled: Arc<AtomicBool>,
        tx: Sender<AsyncCompletion>,
    ) -> Self {
        Self {
            epoch,
            validator,
            cancelled,
            tx,
        }
    }

    /// Epoch of the run this invocation belongs to.
    #[must_use]
    pub fn epoch(&self) -> RunEpoch {
        self.epoch
    }

    /// Whether this run has been superseded.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Take a completer bound to this run and validator.
    #[must_use]
    pub fn completer(&self) -> AsyncCompleter {
        AsyncCompleter {
            epoch: self.epoch,
            validator: self.validator,
            cancelled: Arc::clone(&self.cancelled),
            tx: self.tx.clone(),
        }
    }
}

/// Epoch-bound handle an asynchronous validator resolves through.
///
/// Safe to move to a background thread. Delivery after the run has been
/// superseded is harmless: the runner rejects it by epoch before any state
/// mutation.
#[derive(Debug)]
pub struct AsyncCompleter {
    epoch: RunEpoch,
    validator: usize,
    cancelled: Arc<AtomicBool>,
    tx: Sender<AsyncCompletion>,
}

impl AsyncCompleter {
    /// Epoch this completer belongs to.
    #[must_use]
    pub fn epoch(&self) -> RunEpoch {
        self.epoch
    }

    /// Whether the run was superseded. Well-behaved validators check this
    /// and abandon work (releasing timers, listeners) instead of resolving.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Deliver the verdict. `None` means "no opinion, leave prior state".
    ///
    /// Consumes the completer: one completion per validator per run. A
    /// disconnected runner (engine dropped) is ignored.
    pub fn complete(self, verdict: Option<bool>) {
        let _ = self.tx.send(AsyncCompletion {
            epoch: self.epoch,
            validator: self.validator,
            verdict,
        });
    }
}

// ---------------------------------------------------------------------------
// CompletionChannel
// ---------------------------------------------------------------------------

/// The runner's end of the completion pipe.
#[derive(Debug)]
pub struct CompletionChannel {
    tx: Sender<AsyncCompletion>,
    rx: Receiver<AsyncCompletion>,
}

impl CompletionChannel {
    /// Create a fresh channel.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    /// Sender used to mint [`EvalContext`]s.
    #[must_use]
    pub fn sender(&self) -> Sender<AsyncCompletion> {
        self.tx.clone()
    }

    /// Pop the next pending completion, if any. Never blocks.
    #[must_use]
    pub fn try_recv(&self) -> Option<AsyncCompletion> {
        match self.rx.try_recv() {
            Ok(completion) => Some(completion),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

impl Default for CompletionChannel {
    fn default() -> Self {
        Self::new()
    }
}
