#![forbid(unsafe_code)]

//! The form-participation engine.
//!
//! One [`ControlEngine`] per control instance ties together the value
//! bridge, the validation runner, and the interaction state machine. The
//! concrete control implements [`FormControl`] and delegates its lifecycle
//! calls (connected, focus/blur, invalid, form reset, attribute changes)
//! here; the platform side implements [`FormBinding`] and receives value,
//! validity, and show-error commits.
//!
//! # Run model
//!
//! Every validation run gets a fresh, strictly increasing epoch. Starting a
//! run signals the previous run's cancellation flag; asynchronous
//! validators deliver completions through a channel drained by
//! [`pump`](ControlEngine::pump), and a completion whose epoch is no longer
//! current is discarded before it can touch any state.
//!
//! # Invariants
//!
//! 1. Synchronous validators execute and resolve in strict registration
//!    order before any commit of their portion of the result.
//! 2. Only the current epoch ever mutates committed validity; stale
//!    completions have zero observable effect beyond a trace entry.
//! 3. The committed message belongs to the first validator in registration
//!    order that is invalid at commit time.
//! 4. The show-error marker is a pure function of interaction state,
//!    validity, and the disabled flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use formic_core::event::ControlEvent;
use formic_core::host::{FormBinding, FormControl};
use formic_core::validity::ValidityMap;
use formic_core::value::FormValue;
use formic_validity::{CompletionChannel, EvalContext, RunEpoch, ValidatorSet, Verdict};
use tracing::{debug, trace};

use crate::state::{ControlState, InteractionPhase};
use crate::trace::{RunEvent, ValidationTrace};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bounded number of polls for a validation target that has not yet
/// appeared. After exhaustion the commit stays target-less.
pub const TARGET_RETRY_ATTEMPTS: u8 = 5;

// ---------------------------------------------------------------------------
// RevalidateSource
// ---------------------------------------------------------------------------

/// Which value an attribute-triggered re-validation runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevalidateSource {
    /// The value the form last received. Default: validate what the form
    /// actually holds.
    #[default]
    Committed,
    /// A fresh read from the control's value slot, gated by the commit
    /// predicate.
    Live,
}

// ---------------------------------------------------------------------------
// ValidationTicket
// ---------------------------------------------------------------------------

/// Observation handle for one run's completion.
///
/// A ticket settles once every asynchronous validator of its run has
/// resolved. Tickets from superseded runs never settle — after a
/// cancellation, re-observe via [`ControlEngine::validation_ticket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationTicket {
    epoch: RunEpoch,
}

impl ValidationTicket {
    /// Epoch of the observed run.
    #[must_use]
    pub fn epoch(&self) -> RunEpoch {
        self.epoch
    }
}

// ---------------------------------------------------------------------------
// Internal run / commit bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct RunState {
    epoch: RunEpoch,
    cancelled: Arc<AtomicBool>,
    /// Verdicts known in this run, by validator index.
    verdicts: Vec<Option<bool>>,
    /// Which validators were invoked in this run (partial runs skip some).
    participating: Vec<bool>,
    /// Outstanding asynchronous completions.
    pending: usize,
    /// The value this run validates, for message resolution at commit time.
    value: Option<FormValue>,
}

impl RunState {
    fn idle(len: usize) -> Self {
        Self {
            epoch: RunEpoch::NONE,
            cancelled: Arc::new(AtomicBool::new(false)),
            verdicts: vec![None; len],
            participating: vec![false; len],
            pending: 0,
            value: None,
        }
    }
}

#[derive(Debug)]
struct CommittedValidity {
    validity: ValidityMap,
    message: Option<String>,
    /// Last committed verdict per validator, carried forward for conditions
    /// a run leaves pending or untouched.
    per_validator: Vec<Option<bool>>,
}

// ---------------------------------------------------------------------------
// ControlEngine
// ---------------------------------------------------------------------------

/// The validity engine composed into a form-participating control.
pub struct ControlEngine {
    validators: ValidatorSet,
    group_validation: bool,
    require_target: bool,
    revalidate_source: RevalidateSource,
    state: ControlState,
    committed: CommittedValidity,
    run: RunState,
    channel: CompletionChannel,
    trace: ValidationTrace,
    next_epoch: RunEpoch,
}

impl std::fmt::Debug for ControlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEngine")
            .field("epoch", &self.run.epoch)
            .field("pending", &self.run.pending)
            .field("validity", &self.committed.validity)
            .field("trace_events", &self.trace.len())
            .finish()
    }
}

impl ControlEngine {
    /// Create an engine over an ordered validator set.
    #[must_use]
    pub fn new(validators: ValidatorSet) -> Self {
        let len = validators.len();
        Self {
            validators,
            group_validation: false,
            require_target: false,
            revalidate_source: RevalidateSource::default(),
            state: ControlState::new(),
            committed: CommittedValidity {
                validity: ValidityMap::new(),
                message: None,
                per_validator: vec![None; len],
            },
            run: RunState::idle(len),
            channel: CompletionChannel::new(),
            trace: ValidationTrace::new(),
            next_epoch: RunEpoch::from_raw(1),
        }
    }

    /// Enable group validation: whenever this control becomes fully valid,
    /// same-group siblings have their validity cleared too.
    #[must_use]
    pub fn with_group_validation(mut self, enabled: bool) -> Self {
        self.group_validation = enabled;
        self
    }

    /// Configure which value attribute-triggered re-validation uses.
    #[must_use]
    pub fn with_revalidate_source(mut self, source: RevalidateSource) -> Self {
        self.revalidate_source = source;
        self
    }

    /// Declare that this control strictly requires a validation target.
    ///
    /// The bounded availability poll then panics on exhaustion instead of
    /// degrading silently.
    #[must_use]
    pub fn with_required_target(mut self, required: bool) -> Self {
        self.require_target = required;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Latest committed validity snapshot.
    #[must_use]
    pub fn validity(&self) -> ValidityMap {
        self.committed.validity
    }

    /// Whether the control is currently valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.committed.validity.is_valid()
    }

    /// Latest committed message, if any.
    #[must_use]
    pub fn validation_message(&self) -> Option<&str> {
        self.committed.message.as_deref()
    }

    /// The control's internal value, held across commit gating.
    #[must_use]
    pub fn current_value(&self) -> Option<&FormValue> {
        self.state.current_value.as_ref()
    }

    /// The value the form last received.
    #[must_use]
    pub fn committed_value(&self) -> Option<&FormValue> {
        self.state.committed_value.as_ref()
    }

    /// Interaction state, read-only.
    #[must_use]
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Run lifecycle trace.
    #[must_use]
    pub fn trace(&self) -> &ValidationTrace {
        &self.trace
    }

    /// The registered validators.
    #[must_use]
    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    /// Attribute names the host must observe for re-validation.
    #[must_use]
    pub fn observed_attributes(&self) -> Vec<&str> {
        self.validators.observed_attributes()
    }

    /// Ticket observing the current run.
    #[must_use]
    pub fn validation_ticket(&self) -> ValidationTicket {
        ValidationTicket {
            epoch: self.run.epoch,
        }
    }

    /// Whether a ticket's run has fully settled. Superseded tickets never
    /// settle.
    #[must_use]
    pub fn is_settled(&self, ticket: &ValidationTicket) -> bool {
        ticket.epoch == self.run.epoch && self.run.pending == 0
    }

    /// Current show-error decision for the given control.
    #[must_use]
    pub fn should_show_error<C: FormControl>(&self, control: &C) -> bool {
        self.state
            .show_error(self.committed.validity.is_valid(), control.is_disabled())
    }

    /// Derived interaction phase for the given control.
    #[must_use]
    pub fn phase<C: FormControl>(&self, control: &C) -> InteractionPhase {
        self.state
            .phase(self.committed.validity.is_valid(), control.is_disabled())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Attach: seed the value slots and run the initial validation so the
    /// control is never in an unvalidated limbo.
    pub fn connected<C: FormControl, F: FormBinding>(&mut self, control: &mut C, form: &mut F) {
        self.state.current_value = control.value();
        let committed = if control.should_form_value_update() {
            self.state.current_value.clone()
        } else {
            None
        };
        form.set_form_value(committed.as_ref());
        self.state.committed_value = committed;
        let value = self.state.committed_value.clone();
        self.run_scoped(control, form, value.as_ref(), None);
        self.refresh_error_display(control, form);
    }

    /// Detach: signal cancellation to the in-flight run so asynchronous
    /// validators abandon work and release their resources. Committed
    /// validity and interaction state are kept; a later
    /// [`connected`](Self::connected) re-validates from scratch.
    pub fn disconnected(&mut self) {
        if self.run.epoch.is_none() {
            return;
        }
        self.run.cancelled.store(true, Ordering::SeqCst);
        debug!(epoch = self.run.epoch.raw(), "disconnected; run cancelled");
        self.trace.push(RunEvent::Cancelled {
            epoch: self.run.epoch,
            superseded_by: RunEpoch::NONE,
        });
        self.run = RunState::idle(self.validators.len());
    }

    /// Dispatch a host-delivered event.
    pub fn handle_event<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
        event: &ControlEvent,
    ) {
        match event {
            ControlEvent::Focus(true) => self.focus_gained(control, form),
            ControlEvent::Focus(false) => self.focus_lost(control, form),
            ControlEvent::Invalid => self.invalid_signaled(control, form),
            ControlEvent::FormReset => self.form_reset(control, form),
            ControlEvent::AttributeChanged(name) => self.attribute_changed(control, form, name),
            ControlEvent::DisabledChanged => self.disabled_changed(control, form),
        }
    }

    // -----------------------------------------------------------------------
    // Value/Checked Bridge
    // -----------------------------------------------------------------------

    /// The single authorized entry point by which a control reports its
    /// value.
    ///
    /// Side effects, in order: clear forced-error, clear the visible
    /// message, commit the (possibly gated-off) value to the form, run
    /// validation against the committed value, notify the value-changed
    /// hook, recompute show-error. Never debounced or diffed: the same
    /// value re-runs the full pipeline.
    pub fn set_value<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
        value: Option<FormValue>,
    ) {
        self.state.forced_error = false;
        self.set_display_message(control, None);
        self.state.current_value = value;

        let committed = if control.should_form_value_update() {
            self.state.current_value.clone()
        } else {
            None
        };
        form.set_form_value(committed.as_ref());
        self.state.committed_value = committed;

        let value_for_run = self.state.committed_value.clone();
        self.run_scoped(control, form, value_for_run.as_ref(), None);

        // Fire-and-forget: any work this hook starts is not awaited.
        control.value_changed_callback(self.state.committed_value.as_ref());

        self.refresh_error_display(control, form);
    }

    /// Re-run the bridge with the held internal value. Call when the commit
    /// gate flips (e.g. a checkbox toggling checked) so the form picks up
    /// or drops the value without the control re-reporting it.
    pub fn refresh_value<C: FormControl, F: FormBinding>(&mut self, control: &mut C, form: &mut F) {
        let value = self.state.current_value.clone();
        self.set_value(control, form, value);
    }

    // -----------------------------------------------------------------------
    // Interaction events
    // -----------------------------------------------------------------------

    /// Focus gained: marks touched and re-derives show-error.
    pub fn focus_gained<C: FormControl, F: FormBinding>(&mut self, control: &mut C, form: &mut F) {
        self.state.focus_gained();
        self.refresh_error_display(control, form);
    }

    /// Focus lost: re-validates the committed value (null when the commit
    /// gate is off) and makes a still-invalid result sticky.
    pub fn focus_lost<C: FormControl, F: FormBinding>(&mut self, control: &mut C, form: &mut F) {
        self.state.focus_lost();
        let value = if control.should_form_value_update() {
            self.state.committed_value.clone()
        } else {
            None
        };
        self.run_scoped(control, form, value.as_ref(), None);
        if !self.committed.validity.is_valid() {
            self.state.forced_error = true;
        }
        self.refresh_error_display(control, form);
    }

    /// Platform-level invalid signal: marks touched and forces the error
    /// regardless of focus. While awaiting a validation target, a target
    /// that has since appeared is re-committed first.
    pub fn invalid_signaled<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
    ) {
        if self.state.awaiting_target
            && let Some(target) = control.validation_target()
        {
            debug!(epoch = self.run.epoch.raw(), "late validation target; re-committing");
            self.state.awaiting_target = false;
            form.set_validity(
                &self.committed.validity,
                self.committed.message.as_deref(),
                Some(&target),
            );
        }
        self.state.touched = true;
        self.state.forced_error = true;
        self.refresh_error_display(control, form);
    }

    /// Form reset: clears touched/forced-error, invokes the control's reset
    /// hook, re-derives show-error (false right after reset).
    pub fn form_reset<C: FormControl, F: FormBinding>(&mut self, control: &mut C, form: &mut F) {
        self.state.reset();
        control.reset_form_control();
        self.refresh_error_display(control, form);
    }

    /// Disabled flag flipped: re-derive show-error without touching
    /// validity.
    pub fn disabled_changed<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
    ) {
        self.refresh_error_display(control, form);
    }

    /// An observed attribute changed: re-run exactly the validators tied to
    /// it, against the configured value source.
    pub fn attribute_changed<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
        name: &str,
    ) {
        let triggered = self.validators.triggered_by(name);
        if triggered.is_empty() {
            return;
        }
        let value = match self.revalidate_source {
            RevalidateSource::Committed => self.state.committed_value.clone(),
            RevalidateSource::Live => {
                if control.should_form_value_update() {
                    control.value()
                } else {
                    None
                }
            }
        };
        self.run_scoped(control, form, value.as_ref(), Some(&triggered));
        self.refresh_error_display(control, form);
    }

    /// Overall validity check. An invalid control routes through the
    /// invalid pathway (touched + forced error + target handshake).
    pub fn check_validity<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
    ) -> bool {
        let valid = self.committed.validity.is_valid();
        if !valid {
            self.invalid_signaled(control, form);
        }
        valid
    }

    // -----------------------------------------------------------------------
    // Async completions
    // -----------------------------------------------------------------------

    /// Drain asynchronous validator completions and retry the focus-target
    /// poll. Call from the host loop whenever async work may have finished.
    ///
    /// Returns the number of completions applied to the current run.
    pub fn pump<C: FormControl, F: FormBinding>(&mut self, control: &mut C, form: &mut F) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.channel.try_recv() {
            if completion.epoch != self.run.epoch {
                trace!(
                    stale = completion.epoch.raw(),
                    current = self.run.epoch.raw(),
                    "stale completion discarded"
                );
                self.trace.push(RunEvent::StaleDiscarded {
                    epoch: completion.epoch,
                    current: self.run.epoch,
                });
                continue;
            }
            if completion.validator >= self.run.verdicts.len() {
                continue;
            }
            if self.run.pending > 0 {
                self.run.pending -= 1;
            }
            self.trace.push(RunEvent::Resolved {
                epoch: completion.epoch,
                validator: completion.validator,
                verdict: completion.verdict,
                synchronous: false,
            });
            if let Some(ok) = completion.verdict {
                self.run.verdicts[completion.validator] = Some(ok);
            }
            self.commit(control, form);
            applied += 1;
        }
        self.retry_validation_target(control, form);
        applied
    }

    // -----------------------------------------------------------------------
    // Runner internals
    // -----------------------------------------------------------------------

    /// Run validation. `scope` of `None` runs every validator; a partial
    /// scope re-runs only the listed indices and carries committed verdicts
    /// for the rest.
    fn run_scoped<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
        value: Option<&FormValue>,
        scope: Option<&[usize]>,
    ) {
        let epoch = self.next_epoch;
        self.next_epoch = epoch.next();

        // Supersede the previous run: signal its cancellation flag so
        // in-flight validators can abandon work and release resources.
        if !self.run.epoch.is_none() {
            self.run.cancelled.store(true, Ordering::SeqCst);
            trace!(superseded = self.run.epoch.raw(), by = epoch.raw(), "run superseded");
            self.trace.push(RunEvent::Cancelled {
                epoch: self.run.epoch,
                superseded_by: epoch,
            });
        }

        let len = self.validators.len();
        self.run = RunState {
            epoch,
            cancelled: Arc::new(AtomicBool::new(false)),
            verdicts: vec![None; len],
            participating: vec![false; len],
            pending: 0,
            value: value.cloned(),
        };
        debug!(epoch = epoch.raw(), validators = len, "validation run");
        self.trace.push(RunEvent::Started { epoch });

        let mut sync_changed = false;
        for (index, validator) in self.validators.iter().enumerate() {
            if let Some(scope) = scope
                && !scope.contains(&index)
            {
                continue;
            }
            self.run.participating[index] = true;
            let cx = EvalContext::new(
                epoch,
                index,
                Arc::clone(&self.run.cancelled),
                self.channel.sender(),
            );
            match validator.evaluate(control, value, &cx) {
                Verdict::Pending => {
                    self.run.pending += 1;
                    trace!(epoch = epoch.raw(), validator = index, "verdict deferred");
                }
                verdict => {
                    let ok = verdict == Verdict::Valid;
                    if self.committed.per_validator[index] != Some(ok) {
                        sync_changed = true;
                    }
                    self.run.verdicts[index] = Some(ok);
                    self.trace.push(RunEvent::Resolved {
                        epoch,
                        validator: index,
                        verdict: Some(ok),
                        synchronous: true,
                    });
                }
            }
        }

        // Commit now unless only async validators can still change the
        // picture.
        if self.run.pending == 0 || sync_changed {
            self.commit(control, form);
        }
    }

    /// Build the validity map for the current run: verdicts known in this
    /// run win; pending or skipped validators carry their last committed
    /// verdict.
    fn effective_map(&self) -> ValidityMap {
        let mut map = ValidityMap::new();
        for (index, validator) in self.validators.iter().enumerate() {
            let effective = self.run.verdicts[index].or(self.committed.per_validator[index]);
            if effective == Some(false) {
                map.set(validator.kind(), true);
            }
        }
        map
    }

    /// Select the surfaced message: the first validator in registration
    /// order whose verdict is authoritative and invalid. A verdict is
    /// authoritative when known in this run, or committed earlier for a
    /// validator this run did not invoke; a validator still pending in this
    /// run has no say. Falls back to the previously committed message when
    /// the map is invalid purely through carried state.
    fn select_message<C: FormControl>(&self, control: &C) -> Option<String> {
        for (index, validator) in self.validators.iter().enumerate() {
            let authoritative = match self.run.verdicts[index] {
                Some(verdict) => Some(verdict),
                None if !self.run.participating[index] => self.committed.per_validator[index],
                None => None,
            };
            if authoritative == Some(false) {
                if let Some(message) = control.validity_callback(validator.kind())
                    && !message.is_empty()
                {
                    return Some(message);
                }
                return Some(validator.message(control, self.run.value.as_ref()));
            }
        }
        self.committed.message.clone()
    }

    /// Commit the current snapshot to the host: validity map, selected
    /// message, focus target when available.
    fn commit<C: FormControl, F: FormBinding>(&mut self, control: &mut C, form: &mut F) {
        let map = self.effective_map();
        let message = if map.is_valid() {
            None
        } else {
            self.select_message(control)
        };
        let target = control.validation_target();

        // The focus handshake only matters for invalid commits; a commit
        // without a target starts the bounded availability poll, once per
        // run.
        if target.is_some() {
            self.state.awaiting_target = false;
        } else if !map.is_valid()
            && !self.state.awaiting_target
            && self.state.target_exhausted_epoch != self.run.epoch
        {
            self.state.awaiting_target = true;
            self.state.target_retries = TARGET_RETRY_ATTEMPTS;
        }

        debug!(epoch = self.run.epoch.raw(), validity = %map, "commit");
        form.set_validity(&map, message.as_deref(), target.as_ref());
        self.trace.push(RunEvent::Committed {
            epoch: self.run.epoch,
            valid: map.is_valid(),
        });

        self.committed.validity = map;
        for (slot, verdict) in self
            .committed
            .per_validator
            .iter_mut()
            .zip(&self.run.verdicts)
        {
            if verdict.is_some() {
                *slot = *verdict;
            }
        }
        self.committed.message = message.clone();

        if map.is_valid() && self.group_validation {
            form.clear_group_validity();
        }

        self.set_display_message(control, message);
        self.refresh_error_display(control, form);
    }

    /// Bounded poll for a validation target that was missing at commit
    /// time.
    fn retry_validation_target<C: FormControl, F: FormBinding>(
        &mut self,
        control: &mut C,
        form: &mut F,
    ) {
        if !self.state.awaiting_target {
            return;
        }
        if let Some(target) = control.validation_target() {
            debug!(epoch = self.run.epoch.raw(), "validation target appeared; re-committing");
            self.state.awaiting_target = false;
            form.set_validity(
                &self.committed.validity,
                self.committed.message.as_deref(),
                Some(&target),
            );
        } else if self.state.target_retries == 0 {
            assert!(
                !self.require_target,
                "control declares a required validation target but none became available"
            );
            debug!(epoch = self.run.epoch.raw(), "no validation target; degrading");
            self.state.awaiting_target = false;
            self.state.target_exhausted_epoch = self.run.epoch;
        } else {
            self.state.target_retries -= 1;
        }
    }

    fn set_display_message<C: FormControl>(&mut self, control: &mut C, message: Option<String>) {
        if self.state.displayed_message != message {
            control.validation_message_callback(message.as_deref());
            self.state.displayed_message = message;
        }
    }

    fn refresh_error_display<C: FormControl, F: FormBinding>(
        &mut self,
        control: &C,
        form: &mut F,
    ) {
        let shown = self
            .state
            .show_error(self.committed.validity.is_valid(), control.is_disabled());
        if shown != self.state.error_shown {
            self.state.error_shown = shown;
            form.set_error_shown(shown);
        }
    }
}
