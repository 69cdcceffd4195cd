//! End-to-end engine behavior: bridge, runner, and interaction state
//! working against a scripted control and a recording form binding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use formic_control::{ControlEngine, RevalidateSource, TARGET_RETRY_ATTEMPTS};
use formic_core::event::ControlEvent;
use formic_core::host::{ControlView, FocusTarget, FormBinding, FormControl};
use formic_core::validity::{ValidityKind, ValidityMap};
use formic_core::value::FormValue;
use formic_validity::{
    AsyncCompleter, EvalContext, MinLengthValidator, RequiredValidator, Validator, ValidatorSet,
    Verdict,
};

// ============================================================================
// Harness
// ============================================================================

#[derive(Default)]
struct ScriptedControl {
    attributes: HashMap<String, String>,
    value: Option<FormValue>,
    checked: bool,
    gate_on_checked: bool,
    disabled: bool,
    target: Option<FocusTarget>,
    overrides: HashMap<&'static str, String>,
    messages: Vec<Option<String>>,
    committed_values: Vec<Option<FormValue>>,
    resets: usize,
}

impl ScriptedControl {
    fn new() -> Self {
        Self {
            checked: true,
            ..Self::default()
        }
    }

    fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    fn checkbox_like() -> Self {
        Self {
            gate_on_checked: true,
            ..Self::default()
        }
    }
}

impl ControlView for ScriptedControl {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl FormControl for ScriptedControl {
    fn value(&self) -> Option<FormValue> {
        self.value.clone()
    }

    fn is_checked(&self) -> bool {
        self.checked
    }

    fn should_form_value_update(&self) -> bool {
        if self.gate_on_checked { self.checked } else { true }
    }

    fn reset_form_control(&mut self) {
        self.resets += 1;
        self.value = None;
    }

    fn validity_callback(&self, kind: ValidityKind) -> Option<String> {
        self.overrides.get(kind.code()).cloned()
    }

    fn validation_message_callback(&mut self, message: Option<&str>) {
        self.messages.push(message.map(str::to_string));
    }

    fn value_changed_callback(&mut self, value: Option<&FormValue>) {
        self.committed_values.push(value.cloned());
    }

    fn validation_target(&self) -> Option<FocusTarget> {
        self.target.clone()
    }
}

#[derive(Default)]
struct RecordingForm {
    values: Vec<Option<FormValue>>,
    validity_commits: Vec<(ValidityMap, Option<String>, Option<FocusTarget>)>,
    error_shown: Vec<bool>,
    group_clears: usize,
}

impl RecordingForm {
    fn last_validity(&self) -> &(ValidityMap, Option<String>, Option<FocusTarget>) {
        self.validity_commits.last().expect("no validity committed")
    }
}

impl FormBinding for RecordingForm {
    fn set_form_value(&mut self, value: Option<&FormValue>) {
        self.values.push(value.cloned());
    }

    fn set_validity(
        &mut self,
        validity: &ValidityMap,
        message: Option<&str>,
        target: Option<&FocusTarget>,
    ) {
        self.validity_commits
            .push((*validity, message.map(str::to_string), target.cloned()));
    }

    fn set_error_shown(&mut self, shown: bool) {
        self.error_shown.push(shown);
    }

    fn clear_group_validity(&mut self) {
        self.group_clears += 1;
    }
}

/// Fixed synchronous verdict with a distinct message.
struct Fixed {
    valid: bool,
    label: &'static str,
    kind: ValidityKind,
}

impl Fixed {
    fn invalid(label: &'static str, kind: ValidityKind) -> Box<dyn Validator> {
        Box::new(Self {
            valid: false,
            label,
            kind,
        })
    }

    fn valid(label: &'static str, kind: ValidityKind) -> Box<dyn Validator> {
        Box::new(Self {
            valid: true,
            label,
            kind,
        })
    }
}

impl Validator for Fixed {
    fn kind(&self) -> ValidityKind {
        self.kind
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        self.label.to_string()
    }

    fn evaluate(
        &self,
        _host: &dyn ControlView,
        _value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        Verdict::from_bool(self.valid)
    }
}

/// Async validator: parks its completer together with the text length it
/// saw; the test resolves completers by hand to script interleavings.
struct DeferredMinLen {
    parked: Arc<Mutex<Vec<(AsyncCompleter, usize)>>>,
}

impl DeferredMinLen {
    fn new() -> (Box<dyn Validator>, Arc<Mutex<Vec<(AsyncCompleter, usize)>>>) {
        let parked = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Self {
                parked: Arc::clone(&parked),
            }),
            parked,
        )
    }
}

impl Validator for DeferredMinLen {
    fn kind(&self) -> ValidityKind {
        ValidityKind::TooShort
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        "checked too late".to_string()
    }

    fn evaluate(
        &self,
        _host: &dyn ControlView,
        value: Option<&FormValue>,
        cx: &EvalContext,
    ) -> Verdict {
        let len = value.and_then(FormValue::text_len).unwrap_or(0);
        self.parked.lock().unwrap().push((cx.completer(), len));
        Verdict::Pending
    }
}

/// Counts invocations; used to prove partial attribute-triggered runs.
struct Counting {
    calls: Arc<Mutex<usize>>,
    triggers: Vec<&'static str>,
}

impl Counting {
    fn new(triggers: Vec<&'static str>) -> (Box<dyn Validator>, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        (
            Box::new(Self {
                calls: Arc::clone(&calls),
                triggers,
            }),
            calls,
        )
    }
}

impl Validator for Counting {
    fn trigger_attributes(&self) -> &[&str] {
        &self.triggers
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        "counting".to_string()
    }

    fn evaluate(
        &self,
        _host: &dyn ControlView,
        _value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        *self.calls.lock().unwrap() += 1;
        Verdict::Valid
    }
}

// ============================================================================
// Message selection
// ============================================================================

#[test]
fn first_invalid_validator_in_registration_order_owns_the_message() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![
        Fixed::valid("first", ValidityKind::ValueMissing),
        Fixed::invalid("second", ValidityKind::TooShort),
        Fixed::invalid("third", ValidityKind::Custom),
    ]));
    let mut control = ScriptedControl::new();
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.set_value(&mut control, &mut form, Some(FormValue::text("x")));

    assert!(!engine.is_valid());
    assert_eq!(engine.validation_message(), Some("second"));
    let (map, message, _) = form.last_validity();
    assert!(map.is_violated(ValidityKind::TooShort));
    assert!(map.is_violated(ValidityKind::Custom));
    assert!(!map.is_violated(ValidityKind::ValueMissing));
    assert_eq!(message.as_deref(), Some("second"));
}

#[test]
fn validity_callback_override_beats_validator_message() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        MinLengthValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("minlength", "5");
    control
        .overrides
        .insert(ValidityKind::TooShort.code(), "use more letters".to_string());
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.set_value(&mut control, &mut form, Some(FormValue::text("ab")));

    assert_eq!(engine.validation_message(), Some("use more letters"));
}

// ============================================================================
// Validity transitions and group clearing
// ============================================================================

#[test]
fn satisfying_value_empties_the_validity_map() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    assert!(!engine.is_valid());

    engine.set_value(&mut control, &mut form, Some(FormValue::text("present")));
    assert!(engine.is_valid());
    assert!(form.last_validity().0.is_valid());
    assert_eq!(engine.validation_message(), None);
}

#[test]
fn group_validation_clears_siblings_only_when_valid() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]))
    .with_group_validation(true);
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    assert_eq!(form.group_clears, 0, "invalid commits never clear the group");

    engine.set_value(&mut control, &mut form, Some(FormValue::text("picked")));
    assert_eq!(form.group_clears, 1);
}

// ============================================================================
// Async cancellation and staleness
// ============================================================================

#[test]
fn superseded_async_run_has_no_observable_effect() {
    let (validator, parked) = DeferredMinLen::new();
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![validator]));
    let mut control = ScriptedControl::new();
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.set_value(&mut control, &mut form, Some(FormValue::text("f")));
    engine.set_value(&mut control, &mut form, Some(FormValue::text("fo")));

    // Two supersessions: the connected run and the "f" run each got
    // cancelled by the next set_value.
    assert_eq!(engine.trace().cancellation_count(), 2);

    // Resolve everything out of order: stale completions first.
    let completions: Vec<(AsyncCompleter, usize)> = parked.lock().unwrap().drain(..).collect();
    assert_eq!(completions.len(), 3);
    for (completer, len) in completions {
        let cancelled = completer.is_cancelled();
        completer.complete(Some(len >= 2));
        // Only the "fo" run is still current.
        assert_eq!(cancelled, len < 2);
    }
    engine.pump(&mut control, &mut form);

    // Exactly one commit, reflecting "fo" only.
    assert_eq!(form.validity_commits.len(), 1);
    assert!(engine.is_valid());
    let stale = engine
        .trace()
        .events()
        .iter()
        .filter(|e| e.event_type() == "stale_discarded")
        .count();
    assert_eq!(stale, 2);
}

#[test]
fn trace_checksum_is_reproducible_for_identical_scripts() {
    let run = || {
        let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
            RequiredValidator::new(),
        )]));
        let mut control = ScriptedControl::new().with_attribute("required", "");
        let mut form = RecordingForm::default();
        engine.connected(&mut control, &mut form);
        engine.set_value(&mut control, &mut form, Some(FormValue::text("a")));
        engine.set_value(&mut control, &mut form, None);
        engine.trace().checksum()
    };
    assert_eq!(run(), run());
}

// ============================================================================
// Sticky blur errors
// ============================================================================

#[test]
fn blur_with_invalid_value_sets_sticky_error_until_corrected() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(true));
    assert!(
        !engine.should_show_error(&control),
        "error stays hidden while focused"
    );

    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(false));
    assert!(engine.should_show_error(&control));

    // Focus returns and leaves without a value change: still shown.
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(true));
    assert!(engine.should_show_error(&control), "sticky across re-focus");
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(false));
    assert!(engine.should_show_error(&control));

    // Correcting the value clears it immediately.
    engine.set_value(&mut control, &mut form, Some(FormValue::text("fixed")));
    assert!(!engine.should_show_error(&control));
}

#[test]
fn invalid_signal_forces_error_even_while_focused() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(true));
    engine.handle_event(&mut control, &mut form, &ControlEvent::Invalid);

    assert!(engine.should_show_error(&control));
    assert!(engine.state().touched);
    assert!(engine.state().forced_error);
}

// ============================================================================
// Commit gating (checked slot)
// ============================================================================

#[test]
fn gated_control_contributes_nothing_until_checked() {
    let mut engine = ControlEngine::new(ValidatorSet::empty());
    let mut control = ScriptedControl::checkbox_like();
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.set_value(&mut control, &mut form, Some(FormValue::text("foo")));
    assert_eq!(form.values.last().unwrap(), &None);
    assert_eq!(engine.committed_value(), None);
    assert_eq!(
        engine.current_value(),
        Some(&FormValue::text("foo")),
        "the internal value is held across gating"
    );

    // Checking the control re-contributes the held value.
    control.checked = true;
    engine.refresh_value(&mut control, &mut form);
    assert_eq!(form.values.last().unwrap(), &Some(FormValue::text("foo")));
    assert_eq!(engine.committed_value(), Some(&FormValue::text("foo")));
}

#[test]
fn value_changed_hook_sees_the_gated_value() {
    let mut engine = ControlEngine::new(ValidatorSet::empty());
    let mut control = ScriptedControl::checkbox_like();
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.set_value(&mut control, &mut form, Some(FormValue::text("foo")));
    assert_eq!(control.committed_values.last().unwrap(), &None);

    control.checked = true;
    engine.refresh_value(&mut control, &mut form);
    assert_eq!(
        control.committed_values.last().unwrap(),
        &Some(FormValue::text("foo"))
    );
}

// ============================================================================
// Disabled gating
// ============================================================================

#[test]
fn disabling_suppresses_shown_error_and_reenabling_restores_it() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(true));
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(false));
    assert!(engine.should_show_error(&control));

    control.disabled = true;
    engine.handle_event(&mut control, &mut form, &ControlEvent::DisabledChanged);
    assert!(!engine.should_show_error(&control));
    assert_eq!(form.error_shown.last(), Some(&false));
    assert!(!engine.is_valid(), "underlying validity is untouched");

    control.disabled = false;
    engine.handle_event(&mut control, &mut form, &ControlEvent::DisabledChanged);
    assert!(engine.should_show_error(&control), "prior decision restored");
    assert_eq!(form.error_shown.last(), Some(&true));
}

// ============================================================================
// Form reset
// ============================================================================

#[test]
fn form_reset_clears_interaction_state_and_calls_hook() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(true));
    engine.handle_event(&mut control, &mut form, &ControlEvent::Focus(false));
    assert!(engine.should_show_error(&control));

    engine.handle_event(&mut control, &mut form, &ControlEvent::FormReset);
    assert_eq!(control.resets, 1);
    assert!(!engine.state().touched);
    assert!(!engine.state().forced_error);
    assert!(!engine.should_show_error(&control));
}

// ============================================================================
// check_validity
// ============================================================================

#[test]
fn check_validity_routes_through_the_invalid_pathway() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    assert!(!engine.check_validity(&mut control, &mut form));
    assert!(engine.state().touched);
    assert!(engine.state().forced_error);

    engine.set_value(&mut control, &mut form, Some(FormValue::text("v")));
    assert!(engine.check_validity(&mut control, &mut form));
}

// ============================================================================
// Focus-target handshake
// ============================================================================

#[test]
fn late_validation_target_is_recommitted_on_invalid_signal() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    assert!(form.last_validity().2.is_none());
    assert!(engine.state().awaiting_target);

    // The target appears; the next invalid signal re-commits with it before
    // normal handling.
    control.target = Some(FocusTarget::new("inner"));
    engine.handle_event(&mut control, &mut form, &ControlEvent::Invalid);
    assert_eq!(
        form.last_validity().2.as_ref().map(FocusTarget::id),
        Some("inner")
    );
    assert!(!engine.state().awaiting_target);
}

#[test]
fn target_poll_is_bounded_and_degrades_silently() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    assert!(engine.state().awaiting_target);

    for _ in 0..=u32::from(TARGET_RETRY_ATTEMPTS) {
        engine.pump(&mut control, &mut form);
    }
    assert!(!engine.state().awaiting_target, "bounded poll must give up");

    // The control still functions; no focus delegation, no panic.
    engine.set_value(&mut control, &mut form, Some(FormValue::text("ok")));
    assert!(engine.is_valid());
}

#[test]
#[should_panic(expected = "required validation target")]
fn strictly_required_target_fails_loudly_on_exhaustion() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]))
    .with_required_target(true);
    let mut control = ScriptedControl::new().with_attribute("required", "");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    for _ in 0..=u32::from(TARGET_RETRY_ATTEMPTS) {
        engine.pump(&mut control, &mut form);
    }
}

#[test]
fn target_available_at_commit_time_is_passed_through() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        RequiredValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("required", "");
    control.target = Some(FocusTarget::new("inner"));
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    assert_eq!(
        form.last_validity().2.as_ref().map(FocusTarget::id),
        Some("inner")
    );
    assert!(!engine.state().awaiting_target);
}

// ============================================================================
// Attribute-triggered re-validation
// ============================================================================

#[test]
fn attribute_change_reruns_only_tied_validators() {
    let (required_like, required_calls) = Counting::new(vec!["required"]);
    let (length_like, length_calls) = Counting::new(vec!["minlength", "maxlength"]);
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![required_like, length_like]));
    let mut control = ScriptedControl::new();
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    assert_eq!((*required_calls.lock().unwrap(), *length_calls.lock().unwrap()), (1, 1));

    engine.handle_event(
        &mut control,
        &mut form,
        &ControlEvent::AttributeChanged("minlength".into()),
    );
    assert_eq!((*required_calls.lock().unwrap(), *length_calls.lock().unwrap()), (1, 2));

    engine.handle_event(
        &mut control,
        &mut form,
        &ControlEvent::AttributeChanged("maxlength".into()),
    );
    assert_eq!((*required_calls.lock().unwrap(), *length_calls.lock().unwrap()), (1, 3));

    // Unobserved attributes trigger nothing.
    engine.handle_event(
        &mut control,
        &mut form,
        &ControlEvent::AttributeChanged("placeholder".into()),
    );
    assert_eq!((*required_calls.lock().unwrap(), *length_calls.lock().unwrap()), (1, 3));
}

#[test]
fn revalidate_source_committed_ignores_silent_slot_changes() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        MinLengthValidator::new(),
    )]));
    let mut control = ScriptedControl::new().with_attribute("minlength", "3");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.set_value(&mut control, &mut form, Some(FormValue::text("abcd")));
    assert!(engine.is_valid());

    // The slot changes behind the bridge's back; the committed value is
    // what the form holds, so re-validation still passes.
    control.value = Some(FormValue::text("x"));
    engine.attribute_changed(&mut control, &mut form, "minlength");
    assert!(engine.is_valid());
}

#[test]
fn revalidate_source_live_rereads_the_value_slot() {
    let mut engine = ControlEngine::new(ValidatorSet::new(vec![Box::new(
        MinLengthValidator::new(),
    )]))
    .with_revalidate_source(RevalidateSource::Live);
    let mut control = ScriptedControl::new().with_attribute("minlength", "3");
    let mut form = RecordingForm::default();

    engine.connected(&mut control, &mut form);
    engine.set_value(&mut control, &mut form, Some(FormValue::text("abcd")));
    assert!(engine.is_valid());

    control.value = Some(FormValue::text("x"));
    engine.attribute_changed(&mut control, &mut form, "minlength");
    assert!(!engine.is_valid());
}
